//! Wire-level data model for Antwort's OpenResponses-compliant surface:
//! items, requests, responses, stream events, the API error taxonomy, ID
//! generation, and the state-machine/request validators that sit in front
//! of the engine. No I/O lives here.

mod content;
mod error;
mod event;
mod ids;
mod item;
mod request;
mod response;
mod validate;

pub use content::Annotation;
pub use content::ContentPart;
pub use content::LogProb;
pub use content::Role;
pub use content::TopLogProb;
pub use error::ApiError;
pub use error::ApiErrorKind;
pub use error::Result;
pub use event::StreamEvent;
pub use event::StreamEventKind;
pub use ids::is_item_id;
pub use ids::is_response_id;
pub use ids::new_item_id;
pub use ids::new_response_id;
pub use item::Item;
pub use item::ItemPayload;
pub use item::ItemStatus;
pub use request::CreateResponseRequest;
pub use request::FunctionDef;
pub use request::Tool;
pub use request::ToolChoice;
pub use request::Truncation;
pub use request::ValidationLimits;
pub use response::IncompleteDetails;
pub use response::Response;
pub use response::ResponseStatus;
pub use response::Usage;
pub use validate::is_valid_type_tag;
pub use validate::validate_item;
pub use validate::validate_item_transition;
pub use validate::validate_request;
pub use validate::validate_response_transition;
