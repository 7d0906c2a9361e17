//! Tally backend HTTP client implementation.

use std::collections::HashSet;
use std::time::Duration;

use reqwest::{Client, RequestBuilder, Response};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::config::ApiConfig;
use crate::error::{AppError, Result};
use crate::models::{CreateEmployee, CreatedEmployees, UploadKind, UploadReceipt};
use crate::upload::UploadRow;

#[derive(Deserialize)]
struct EmployeeIds {
    employee_ids: Vec<String>,
}

#[derive(Serialize)]
struct BulkCreateRequest<'a> {
    employees: &'a [CreateEmployee],
}

#[derive(Serialize)]
struct UploadRequest<'a> {
    source: &'a str,
    rows: Vec<serde_json::Map<String, Value>>,
}

/// Tally backend REST client.
///
/// Authenticates every request with the configured bearer token.
#[derive(Clone)]
pub struct TallyClient {
    client: Client,
    base_url: String,
    token: String,
}

impl TallyClient {
    /// Create a new client instance from API settings.
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            token: config.token.trim().to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{base}/api/{path}", base = self.base_url)
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        if self.token.is_empty() {
            builder
        } else {
            builder.bearer_auth(&self.token)
        }
    }

    /// Fetch the ids of every employee known to the tenant.
    pub async fn employee_ids(&self) -> Result<HashSet<String>> {
        let response = self
            .authorized(self.client.get(self.url("employees/ids/")))
            .send()
            .await?;
        let body: EmployeeIds = check_status(response).await?.json().await?;

        debug!("Backend reports {} employees", body.employee_ids.len());
        Ok(body.employee_ids.into_iter().map(|id| id.trim().to_string()).collect())
    }

    /// Create employees in one request.
    pub async fn create_employees(&self, employees: &[CreateEmployee]) -> Result<CreatedEmployees> {
        let response = self
            .authorized(self.client.post(self.url("employees/bulk-create/")))
            .json(&BulkCreateRequest { employees })
            .send()
            .await?;
        let created: CreatedEmployees = check_status(response).await?.json().await?;

        info!("Created {} employees", created.created);
        Ok(created)
    }

    /// Upload sheet rows to the endpoint of their kind.
    pub async fn upload_rows(&self, kind: UploadKind, source: &str, rows: &[UploadRow]) -> Result<UploadReceipt> {
        let request = UploadRequest {
            source,
            rows: rows.iter().map(row_to_json).collect(),
        };
        let response = self
            .authorized(self.client.post(self.url(&format!("uploads/{}/", kind.label()))))
            .json(&request)
            .send()
            .await?;

        Ok(check_status(response).await?.json().await?)
    }

    /// Test connection to the backend.
    pub async fn test_connection(&self) -> Result<bool> {
        let response = self
            .authorized(self.client.get(self.url("health/")))
            .send()
            .await?;
        Ok(response.status().is_success())
    }
}

/// Row payload: the original cells plus the row number for server-side errors.
fn row_to_json(row: &UploadRow) -> serde_json::Map<String, Value> {
    let mut map: serde_json::Map<String, Value> = row
        .cells
        .iter()
        .map(|(header, value)| (header.clone(), Value::String(value.clone())))
        .collect();
    map.insert("row_number".to_string(), Value::from(row.row_number));
    map
}

/// Turn non-success responses into [`AppError::Api`].
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AppError::api(status.as_u16(), error_message(&body, status.canonical_reason())))
}

/// Pull a readable message out of an error body.
fn error_message(body: &str, reason: Option<&str>) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["error", "detail", "message"] {
            if let Some(msg) = json.get(key).and_then(Value::as_str) {
                return msg.to_string();
            }
        }
    }

    let body = body.trim();
    if body.is_empty() {
        reason.unwrap_or("request failed").to_string()
    } else {
        body.chars().take(200).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(base_url: &str) -> TallyClient {
        TallyClient::new(&ApiConfig {
            base_url: base_url.to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_url_building() {
        let c = client("https://tally.example.com/ ");
        assert_eq!(c.url("employees/ids/"), "https://tally.example.com/api/employees/ids/");
    }

    #[test]
    fn test_error_message_from_json() {
        let body = r#"{"error": "Employee E-1 already exists"}"#;
        assert_eq!(error_message(body, Some("Conflict")), "Employee E-1 already exists");

        let body = r#"{"detail": "Authentication credentials were not provided."}"#;
        assert_eq!(
            error_message(body, None),
            "Authentication credentials were not provided."
        );
    }

    #[test]
    fn test_error_message_fallbacks() {
        assert_eq!(error_message("", Some("Bad Gateway")), "Bad Gateway");
        assert_eq!(error_message("  ", None), "request failed");
        assert_eq!(error_message("plain failure", None), "plain failure");
    }

    #[test]
    fn test_row_to_json() {
        let row = UploadRow {
            row_number: 4,
            employee_id: "E-1".to_string(),
            name: "A".to_string(),
            department: None,
            cells: vec![
                ("Employee ID".to_string(), "E-1".to_string()),
                ("Present Days".to_string(), "21".to_string()),
            ],
        };
        let json = row_to_json(&row);
        assert_eq!(json["Employee ID"], "E-1");
        assert_eq!(json["Present Days"], "21");
        assert_eq!(json["row_number"], 4);
    }

    #[tokio::test]
    async fn test_employee_ids_sends_token_and_trims() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/employees/ids/"))
            .and(header("authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "employee_ids": ["E-1", " E-2 "] })))
            .expect(1)
            .mount(&server)
            .await;

        let c = TallyClient::new(&ApiConfig {
            base_url: server.uri(),
            token: " secret ".to_string(),
            ..Default::default()
        })
        .unwrap();
        let ids = c.employee_ids().await.unwrap();

        assert_eq!(ids.len(), 2);
        assert!(ids.contains("E-1"));
        assert!(ids.contains("E-2"));
    }

    #[tokio::test]
    async fn test_create_employees_body_shape() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/employees/bulk-create/"))
            .and(body_json(json!({
                "employees": [{
                    "employee_id": "E-9",
                    "first_name": "Asha",
                    "shift_start_time": "09:00",
                    "shift_end_time": "18:00",
                    "basic_salary": "0",
                    "is_active": true
                }]
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "created": 1, "employee_ids": ["E-9"] })))
            .expect(1)
            .mount(&server)
            .await;

        let employee = CreateEmployee {
            employee_id: "E-9".to_string(),
            first_name: "Asha".to_string(),
            last_name: None,
            department: None,
            date_of_joining: None,
            shift_start_time: "09:00".to_string(),
            shift_end_time: "18:00".to_string(),
            basic_salary: "0".to_string(),
            is_active: true,
        };
        let created = client(&server.uri()).create_employees(&[employee]).await.unwrap();

        assert_eq!(created.created, 1);
        assert_eq!(created.employee_ids, vec!["E-9"]);
    }

    #[tokio::test]
    async fn test_upload_rows_posts_to_kind_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/uploads/salary/"))
            .and(body_json(json!({
                "source": "may.csv",
                "rows": [{ "Employee ID": "S-1", "Basic": "15000", "row_number": 2 }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "accepted": 1 })))
            .expect(1)
            .mount(&server)
            .await;

        let row = UploadRow {
            row_number: 2,
            employee_id: "S-1".to_string(),
            name: String::new(),
            department: None,
            cells: vec![
                ("Employee ID".to_string(), "S-1".to_string()),
                ("Basic".to_string(), "15000".to_string()),
            ],
        };
        let receipt = client(&server.uri())
            .upload_rows(UploadKind::Salary, "may.csv", &[row])
            .await
            .unwrap();

        assert_eq!(receipt.accepted, 1);
        assert_eq!(receipt.message, "");
    }

    #[tokio::test]
    async fn test_error_status_becomes_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/employees/ids/"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({ "detail": "Invalid token." })),
            )
            .mount(&server)
            .await;

        let err = client(&server.uri()).employee_ids().await.unwrap_err();
        match err {
            AppError::Api { status, message } => {
                assert_eq!(status, 401);
                assert_eq!(message, "Invalid token.");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_connection_reports_unhealthy_backend() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/health/"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        assert!(!client(&server.uri()).test_connection().await.unwrap());
    }
}
