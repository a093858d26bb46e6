//! A `ResponseStore` backed by an in-process `IndexMap`. The simplest real
//! collaborator for `antwort-engine`'s persistence seam: enough to exercise
//! the trait boundary (including `previous_response_id` chain walking and
//! `list` pagination) without pulling in a database, the same role a
//! reference in-memory backend plays for any server core built around a
//! storage trait.

use antwort_engine::ListParams;
use antwort_engine::ResponseStore;
use antwort_engine::SortOrder;
use antwort_engine::StoreError;
use antwort_protocol::Item;
use antwort_protocol::Response;
use async_trait::async_trait;
use indexmap::IndexMap;
use tokio::sync::RwLock;

#[derive(Default)]
pub struct MemoryResponseStore {
    responses: RwLock<IndexMap<String, (Response, Vec<Item>)>>,
}

impl MemoryResponseStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ResponseStore for MemoryResponseStore {
    async fn save(&self, response: Response, input_items: Vec<Item>) -> Result<(), StoreError> {
        let mut guard = self.responses.write().await;
        guard.insert(response.id.clone(), (response, input_items));
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Response, StoreError> {
        let guard = self.responses.read().await;
        guard
            .get(id)
            .map(|(response, _)| response.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn get_for_chain(&self, id: &str) -> Result<Vec<Response>, StoreError> {
        let guard = self.responses.read().await;
        let mut chain = Vec::new();
        let mut current = Some(id.to_string());
        while let Some(current_id) = current {
            let (response, _) = guard
                .get(&current_id)
                .ok_or_else(|| StoreError::NotFound(current_id.clone()))?;
            current = response.previous_response_id.clone();
            chain.push(response.clone());
        }
        chain.reverse();
        Ok(chain)
    }

    async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let mut guard = self.responses.write().await;
        Ok(guard.shift_remove(id).is_some())
    }

    async fn list(&self, params: ListParams) -> Result<(Vec<Response>, bool), StoreError> {
        let guard = self.responses.read().await;
        let mut ordered: Vec<Response> = guard.values().map(|(response, _)| response.clone()).collect();
        if params.order == SortOrder::Desc {
            ordered.reverse();
        }
        if let Some(model) = &params.model {
            ordered.retain(|response| &response.model == model);
        }

        // `after`/`before` are resolved against the page's own display order
        // (already desc/asc-sorted above), not insertion order.
        let (window_start, window_end) = match (&params.after, &params.before) {
            (Some(cursor), None) => {
                let idx = ordered.iter().position(|r| &r.id == cursor).map(|i| i + 1).unwrap_or(0);
                (idx, ordered.len())
            }
            (None, Some(cursor)) => {
                let idx = ordered.iter().position(|r| &r.id == cursor).unwrap_or(ordered.len());
                (0, idx)
            }
            _ => (0, ordered.len()),
        };
        let window = &ordered[window_start..window_end];

        let (page, has_more) = if params.before.is_some() {
            let take_from = window.len().saturating_sub(params.limit);
            (window[take_from..].to_vec(), take_from > 0)
        } else {
            (
                window.iter().take(params.limit).cloned().collect(),
                window.len() > params.limit,
            )
        };
        Ok((page, has_more))
    }

    async fn get_input_items(&self, id: &str) -> Result<Vec<Item>, StoreError> {
        let guard = self.responses.read().await;
        guard
            .get(id)
            .map(|(_, input_items)| input_items.clone())
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use antwort_protocol::IncompleteDetails;
    use antwort_protocol::ResponseStatus;
    use antwort_protocol::ToolChoice;
    use antwort_protocol::Truncation;

    fn response(id: &str, previous_response_id: Option<&str>) -> Response {
        Response {
            id: id.to_string(),
            object: "response".into(),
            status: ResponseStatus::Completed,
            output: vec![],
            model: "gpt-test".into(),
            created_at: 0,
            usage: None,
            error: None,
            previous_response_id: previous_response_id.map(str::to_string),
            incomplete_details: None::<IncompleteDetails>,
            instructions: None,
            tools: vec![],
            tool_choice: ToolChoice::Auto,
            store: true,
            truncation: Truncation::Auto,
            temperature: None,
            top_p: None,
            max_output_tokens: None,
            metadata: Default::default(),
            parallel_tool_calls: true,
        }
    }

    #[tokio::test]
    async fn save_then_get_round_trips() {
        let store = MemoryResponseStore::new();
        store.save(response("resp_a", None), vec![]).await.expect("save");
        let fetched = store.get("resp_a").await.expect("get");
        assert_eq!(fetched.id, "resp_a");
    }

    #[tokio::test]
    async fn get_on_missing_id_is_not_found() {
        let store = MemoryResponseStore::new();
        assert!(matches!(store.get("resp_missing").await, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn get_for_chain_walks_oldest_first() {
        let store = MemoryResponseStore::new();
        store.save(response("resp_a", None), vec![]).await.expect("save a");
        store
            .save(response("resp_b", Some("resp_a")), vec![])
            .await
            .expect("save b");
        store
            .save(response("resp_c", Some("resp_b")), vec![])
            .await
            .expect("save c");

        let chain = store.get_for_chain("resp_c").await.expect("chain");
        let ids: Vec<&str> = chain.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["resp_a", "resp_b", "resp_c"]);
    }

    #[tokio::test]
    async fn delete_reports_whether_anything_was_removed() {
        let store = MemoryResponseStore::new();
        store.save(response("resp_a", None), vec![]).await.expect("save");
        assert!(store.delete("resp_a").await.expect("first delete"));
        assert!(!store.delete("resp_a").await.expect("second delete"));
    }

    #[tokio::test]
    async fn list_paginates_after_a_cursor() {
        let store = MemoryResponseStore::new();
        for id in ["resp_a", "resp_b", "resp_c"] {
            store.save(response(id, None), vec![]).await.expect("save");
        }
        let (page, has_more) = store
            .list(ListParams {
                limit: 1,
                after: Some("resp_a".to_string()),
                order: SortOrder::Asc,
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "resp_b");
        assert!(has_more);
    }

    #[tokio::test]
    async fn list_defaults_to_newest_first() {
        let store = MemoryResponseStore::new();
        for id in ["resp_a", "resp_b", "resp_c"] {
            store.save(response(id, None), vec![]).await.expect("save");
        }
        let (page, has_more) = store.list(ListParams { limit: 2, ..Default::default() }).await.expect("list");
        assert_eq!(page.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), vec!["resp_c", "resp_b"]);
        assert!(has_more);
    }

    #[tokio::test]
    async fn list_filters_by_model() {
        let store = MemoryResponseStore::new();
        let mut gpt4 = response("resp_a", None);
        gpt4.model = "gpt-4o".into();
        store.save(gpt4, vec![]).await.expect("save a");
        let mut gpt3 = response("resp_b", None);
        gpt3.model = "gpt-3.5".into();
        store.save(gpt3, vec![]).await.expect("save b");

        let (page, _) = store
            .list(ListParams {
                limit: 10,
                model: Some("gpt-3.5".to_string()),
                ..Default::default()
            })
            .await
            .expect("list");
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].id, "resp_b");
    }
}
