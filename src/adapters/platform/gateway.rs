//! Reqwest-backed `PlatformGateway` implementation.
//!
//! Talks to the community platform's REST API with a bot token. Every
//! response is funneled through one status-mapping function so the sync
//! worker sees the same `PlatformError` taxonomy regardless of endpoint.
//!
//! # Rate limits
//!
//! A 429 carries its backoff hint either as a `Retry-After` header
//! (seconds, possibly fractional) or as a `retry_after` field in the JSON
//! body. Both are honored; the header wins when both are present.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;

use crate::domain::foundation::{GroupId, RoleId, SubjectId};
use crate::domain::sync::GroupRole;
use crate::ports::{ActorContext, Member, PlatformError, PlatformGateway};

/// Platform API configuration.
#[derive(Clone)]
pub struct PlatformConfig {
    /// Bot token presented on every request.
    bot_token: SecretString,

    /// Base URL for the platform API.
    api_base_url: String,
}

impl PlatformConfig {
    pub fn new(bot_token: SecretString) -> Self {
        Self {
            bot_token,
            api_base_url: "https://platform.example.com/api/v1".to_string(),
        }
    }

    /// Set a custom API base URL (for testing).
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.api_base_url = url.into();
        self
    }
}

/// Reqwest-backed platform adapter.
pub struct HttpPlatformGateway {
    config: PlatformConfig,
    http_client: reqwest::Client,
}

impl HttpPlatformGateway {
    pub fn new(config: PlatformConfig) -> Self {
        Self {
            config,
            http_client: reqwest::Client::new(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(
            "Authorization",
            format!("Bot {}", self.config.bot_token.expose_secret()),
        )
    }

    /// Maps a non-success response onto the error taxonomy.
    ///
    /// `context` names the object being operated on so NotFound and
    /// Forbidden messages are actionable in logs and audit details.
    async fn check(
        &self,
        response: reqwest::Response,
        context: &str,
    ) -> Result<reqwest::Response, PlatformError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let headers = response.headers().clone();
        let body = response.text().await.unwrap_or_default();

        match status.as_u16() {
            429 => Err(PlatformError::RateLimited {
                retry_after: parse_retry_after(&headers, &body),
            }),
            403 => Err(PlatformError::Forbidden(context.to_string())),
            404 => Err(PlatformError::NotFound(context.to_string())),
            s if status.is_server_error() => Err(PlatformError::Server { status: s }),
            s => Err(PlatformError::InvalidResponse(format!(
                "unexpected status {s} for {context}"
            ))),
        }
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        context: &str,
    ) -> Result<T, PlatformError> {
        let response = self
            .authorized(self.http_client.get(self.url(path)))
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        self.check(response, context)
            .await?
            .json()
            .await
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))
    }
}

/// Extracts the backoff hint from a 429 response.
fn parse_retry_after(headers: &reqwest::header::HeaderMap, body: &str) -> Option<Duration> {
    let from_header = headers
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<f64>().ok());

    let from_body = serde_json::from_str::<RateLimitBody>(body)
        .ok()
        .map(|b| b.retry_after);

    from_header
        .or(from_body)
        .filter(|secs| *secs >= 0.0)
        .map(Duration::from_secs_f64)
}

#[derive(Debug, Deserialize)]
struct RateLimitBody {
    retry_after: f64,
}

#[derive(Debug, Deserialize)]
struct RoleDto {
    id: String,
    name: String,
    position: i64,
}

impl TryFrom<RoleDto> for GroupRole {
    type Error = PlatformError;

    fn try_from(dto: RoleDto) -> Result<Self, Self::Error> {
        Ok(GroupRole {
            id: RoleId::new(dto.id)
                .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?,
            name: dto.name,
            position: dto.position,
        })
    }
}

#[derive(Debug, Deserialize)]
struct ActorDto {
    can_manage_roles: bool,
    top_role_position: i64,
}

#[derive(Debug, Deserialize)]
struct MemberDto {
    subject_id: String,
    role_ids: Vec<String>,
}

impl TryFrom<MemberDto> for Member {
    type Error = PlatformError;

    fn try_from(dto: MemberDto) -> Result<Self, Self::Error> {
        let subject_id = SubjectId::new(dto.subject_id)
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;
        let role_ids = dto
            .role_ids
            .into_iter()
            .map(|id| RoleId::new(id).map_err(|e| PlatformError::InvalidResponse(e.to_string())))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Member {
            subject_id,
            role_ids,
        })
    }
}

#[async_trait]
impl PlatformGateway for HttpPlatformGateway {
    async fn group_roles(&self, group_id: &GroupId) -> Result<Vec<GroupRole>, PlatformError> {
        let dtos: Vec<RoleDto> = self
            .get_json(
                &format!("/groups/{group_id}/roles"),
                &format!("roles of group {group_id}"),
            )
            .await?;
        dtos.into_iter().map(GroupRole::try_from).collect()
    }

    async fn actor_context(&self, group_id: &GroupId) -> Result<ActorContext, PlatformError> {
        let dto: ActorDto = self
            .get_json(
                &format!("/groups/{group_id}/actor"),
                &format!("bot actor in group {group_id}"),
            )
            .await?;
        Ok(ActorContext {
            can_manage_roles: dto.can_manage_roles,
            top_role_position: dto.top_role_position,
        })
    }

    async fn list_members(&self, group_id: &GroupId) -> Result<Vec<Member>, PlatformError> {
        let dtos: Vec<MemberDto> = self
            .get_json(
                &format!("/groups/{group_id}/members"),
                &format!("members of group {group_id}"),
            )
            .await?;
        dtos.into_iter().map(Member::try_from).collect()
    }

    async fn member(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
    ) -> Result<Option<Member>, PlatformError> {
        let context = format!("member {subject_id} of group {group_id}");
        let response = self
            .authorized(
                self.http_client
                    .get(self.url(&format!("/groups/{group_id}/members/{subject_id}"))),
            )
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        // A subject absent from the group is an answer, not a failure.
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let dto: MemberDto = self
            .check(response, &context)
            .await?
            .json()
            .await
            .map_err(|e| PlatformError::InvalidResponse(e.to_string()))?;
        Member::try_from(dto).map(Some)
    }

    async fn add_role(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
        role_id: &RoleId,
    ) -> Result<(), PlatformError> {
        let response = self
            .authorized(self.http_client.put(self.url(&format!(
                "/groups/{group_id}/members/{subject_id}/roles/{role_id}"
            ))))
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        self.check(
            response,
            &format!("role {role_id} for member {subject_id} in group {group_id}"),
        )
        .await?;
        Ok(())
    }

    async fn remove_role(
        &self,
        group_id: &GroupId,
        subject_id: &SubjectId,
        role_id: &RoleId,
    ) -> Result<(), PlatformError> {
        let response = self
            .authorized(self.http_client.delete(self.url(&format!(
                "/groups/{group_id}/members/{subject_id}/roles/{role_id}"
            ))))
            .send()
            .await
            .map_err(|e| PlatformError::Network(e.to_string()))?;

        self.check(
            response,
            &format!("role {role_id} for member {subject_id} in group {group_id}"),
        )
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::{HeaderMap, HeaderValue};

    // ══════════════════════════════════════════════════════════════
    // Rate-Limit Hint Parsing
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn retry_after_header_is_parsed_as_seconds() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("3"));

        assert_eq!(
            parse_retry_after(&headers, ""),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn fractional_retry_after_is_supported() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("0.25"));

        assert_eq!(
            parse_retry_after(&headers, ""),
            Some(Duration::from_millis(250))
        );
    }

    #[test]
    fn json_body_hint_is_used_when_no_header_is_sent() {
        let headers = HeaderMap::new();

        assert_eq!(
            parse_retry_after(&headers, r#"{"retry_after": 1.5}"#),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn header_hint_wins_over_body_hint() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("2"));

        assert_eq!(
            parse_retry_after(&headers, r#"{"retry_after": 9.0}"#),
            Some(Duration::from_secs(2))
        );
    }

    #[test]
    fn absent_hint_yields_none() {
        assert_eq!(parse_retry_after(&HeaderMap::new(), "not json"), None);
    }

    #[test]
    fn negative_hint_is_discarded() {
        let mut headers = HeaderMap::new();
        headers.insert("retry-after", HeaderValue::from_static("-1"));

        assert_eq!(parse_retry_after(&headers, ""), None);
    }

    // ══════════════════════════════════════════════════════════════
    // Wire Type Conversion
    // ══════════════════════════════════════════════════════════════

    #[test]
    fn member_dto_converts_into_domain_member() {
        let dto = MemberDto {
            subject_id: "100000000000000001".into(),
            role_ids: vec!["900000000000000001".into()],
        };

        let member = Member::try_from(dto).unwrap();
        assert_eq!(member.subject_id.as_str(), "100000000000000001");
        assert_eq!(member.role_ids.len(), 1);
    }

    #[test]
    fn member_dto_with_empty_subject_is_an_invalid_response() {
        let dto = MemberDto {
            subject_id: "".into(),
            role_ids: vec![],
        };

        assert!(matches!(
            Member::try_from(dto),
            Err(PlatformError::InvalidResponse(_))
        ));
    }

    #[test]
    fn role_dto_converts_into_group_role() {
        let dto = RoleDto {
            id: "900000000000000001".into(),
            name: "Gold".into(),
            position: 3,
        };

        let role = GroupRole::try_from(dto).unwrap();
        assert_eq!(role.name, "Gold");
        assert_eq!(role.position, 3);
    }
}
