use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Who authored a chat turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::System => "system",
        }
    }
}

/// A single turn of the conversation transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: Role,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

/// Answer request
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRequest {
    /// Full transcript, oldest turn first. User turns drive retrieval.
    pub user_query: Vec<ChatTurn>,
    /// Caller's session token, verified against the identity service.
    pub jwt: String,
    /// Chat row that receives the citation update.
    pub chat_id: Uuid,
}

/// Descriptive fields stored alongside a document in the backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub name: String,
    #[serde(default)]
    pub section: Option<String>,
    #[serde(default)]
    pub uri: Option<String>,
}

/// A document returned by the hybrid-search function.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedDocument {
    pub id: i64,
    pub content: String,
    pub metadata: DocumentMetadata,
    /// 1-based position in the search ranking.
    pub rank: usize,
}

/// Source reference sent in the SSE `citations` event.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentRef {
    pub id: i64,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
}

impl From<&RetrievedDocument> for DocumentRef {
    fn from(doc: &RetrievedDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.metadata.name.clone(),
            section: doc.metadata.section.clone(),
            uri: doc.metadata.uri.clone(),
        }
    }
}

/// Which documents backed an answer, written to the chat row after the
/// stream opens.
#[derive(Debug, Clone)]
pub struct CitationRecord {
    pub chat_id: Uuid,
    /// Document ids in ranking order.
    pub document_ids: Vec<i64>,
}

impl CitationRecord {
    pub fn from_documents(chat_id: Uuid, documents: &[RetrievedDocument]) -> Self {
        Self {
            chat_id,
            document_ids: documents.iter().map(|d| d.id).collect(),
        }
    }
}

/// The caller identity returned by the identity service.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_to_lowercase() {
        assert_eq!(serde_json::to_value(Role::User).unwrap(), "user");
        assert_eq!(serde_json::to_value(Role::Assistant).unwrap(), "assistant");
        assert_eq!(serde_json::to_value(Role::System).unwrap(), "system");
    }

    #[test]
    fn test_answer_request_accepts_camel_case_fields() {
        let req: AnswerRequest = serde_json::from_value(serde_json::json!({
            "userQuery": [
                { "role": "user", "content": "What causes fever?" },
                { "role": "assistant", "content": "Fever is usually a response to infection." }
            ],
            "jwt": "token",
            "chatId": "8e2f0a49-1a52-4f9e-92a5-5be25f1f38bd"
        }))
        .unwrap();

        assert_eq!(req.user_query.len(), 2);
        assert_eq!(req.user_query[0].role, Role::User);
        assert_eq!(req.jwt, "token");
        assert_eq!(
            req.chat_id.to_string(),
            "8e2f0a49-1a52-4f9e-92a5-5be25f1f38bd"
        );
    }

    #[test]
    fn test_answer_request_rejects_plain_string_query() {
        let result = serde_json::from_value::<AnswerRequest>(serde_json::json!({
            "userQuery": "what is fever",
            "jwt": "token",
            "chatId": "8e2f0a49-1a52-4f9e-92a5-5be25f1f38bd"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_document_metadata_fills_missing_optionals() {
        let meta: DocumentMetadata =
            serde_json::from_value(serde_json::json!({ "name": "Fever basics" })).unwrap();
        assert_eq!(meta.name, "Fever basics");
        assert!(meta.section.is_none());
        assert!(meta.uri.is_none());
    }

    #[test]
    fn test_document_ref_omits_absent_fields() {
        let doc = RetrievedDocument {
            id: 42,
            content: "body".into(),
            metadata: DocumentMetadata {
                name: "Fever basics".into(),
                section: None,
                uri: None,
            },
            rank: 1,
        };
        let json = serde_json::to_value(DocumentRef::from(&doc)).unwrap();
        assert_eq!(json, serde_json::json!({ "id": 42, "name": "Fever basics" }));
    }

    #[test]
    fn test_citation_record_keeps_ranking_order() {
        let docs = vec![
            RetrievedDocument {
                id: 7,
                content: String::new(),
                metadata: DocumentMetadata {
                    name: "a".into(),
                    section: None,
                    uri: None,
                },
                rank: 1,
            },
            RetrievedDocument {
                id: 3,
                content: String::new(),
                metadata: DocumentMetadata {
                    name: "b".into(),
                    section: None,
                    uri: None,
                },
                rank: 2,
            },
        ];
        let record = CitationRecord::from_documents(Uuid::new_v4(), &docs);
        assert_eq!(record.document_ids, vec![7, 3]);
    }
}
