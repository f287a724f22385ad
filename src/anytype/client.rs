//! Operation façade — the named Anytype operations, composed from the
//! request builder, transport and response normalizer.
//!
//! Authentication lifecycle: `create_challenge` issues a pairing challenge,
//! `exchange_code` consumes it and mints the bearer credential, an upstream
//! 401/403 (or `logout`) drops it. Every other operation requires a stored
//! credential and fails fast with `Unauthorized` before any network call.
//!
//! Both front-end adapters call into one shared instance of this type; it is
//! itself transport- and framework-agnostic.

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::anytype::endpoints::{self, Page, RequestDescriptor};
use crate::anytype::error::ApiError;
use crate::anytype::normalize::{Payload, Shape, normalize};
use crate::anytype::transport::{Transport, dispatch};
use crate::models::{
    AnytypeObject, CreateObjectRequest, CreateSpaceRequest, DisplayCodeResponse, ExportFormat,
    Member, ObjectExportResponse, ObjectType, Paginated, SearchQuery, Space, Template,
    TokenResponse,
};
use crate::session::{PendingChallenge, SessionStore};

#[derive(Clone)]
pub struct AnytypeClient {
    transport: Arc<dyn Transport>,
    session: SessionStore,
    app_name: String,
}

impl AnytypeClient {
    pub fn new(transport: Arc<dyn Transport>, session: SessionStore, app_name: String) -> Self {
        Self {
            transport,
            session,
            app_name,
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    /// Run one descriptor through transport and normalizer, enforcing the
    /// credential precondition and the invalidate-on-rejection side effect.
    async fn call(&self, descriptor: RequestDescriptor, shape: Shape) -> Result<Payload, ApiError> {
        let authenticated = descriptor.requires_auth;
        let descriptor = if authenticated {
            let token = self.session.current_credential().await.ok_or_else(|| {
                ApiError::Unauthorized("no active credential; authenticate first".into())
            })?;
            descriptor.with_bearer(token)
        } else {
            descriptor
        };

        let response = dispatch(self.transport.as_ref(), &descriptor).await?;
        let result = normalize(shape, &response);

        // A rejected credential will be rejected again — drop it so the next
        // call fails fast without an upstream round trip.
        if authenticated && matches!(&result, Err(ApiError::Unauthorized(_))) {
            self.session.invalidate().await;
        }

        result
    }

    // ── Auth ─────────────────────────────────────────────────────────────

    /// Ask the upstream app to display a pairing code. The returned challenge
    /// is remembered so `exchange_code` can omit the id.
    pub async fn create_challenge(&self) -> Result<DisplayCodeResponse, ApiError> {
        let descriptor = endpoints::display_code(&self.app_name)?;
        let body = raw(self.call(descriptor, Shape::Raw).await?)?;

        let challenge_id = body
            .get("challenge_id")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ApiError::InvalidResponse("challenge response is missing 'challenge_id'".into())
            })?
            .to_string();
        let code = body
            .get("code")
            .and_then(Value::as_str)
            .map(str::to_string);

        self.session
            .begin_challenge(PendingChallenge {
                challenge_id: challenge_id.clone(),
                code: code.clone(),
            })
            .await;

        tracing::info!(challenge_id = %challenge_id, "auth: pairing challenge issued");
        Ok(DisplayCodeResponse { challenge_id, code })
    }

    /// Exchange the displayed code for a bearer credential. On success the
    /// credential is stored and the challenge is consumed; on failure the
    /// challenge stays pending so the caller can retry with a fresh code.
    pub async fn exchange_code(
        &self,
        challenge_id: Option<&str>,
        code: &str,
    ) -> Result<TokenResponse, ApiError> {
        let challenge_id = match challenge_id {
            Some(id) => id.to_string(),
            None => self
                .session
                .pending_challenge()
                .await
                .map(|c| c.challenge_id)
                .ok_or_else(|| {
                    ApiError::MalformedRequest(
                        "no pending challenge; request a display code first".into(),
                    )
                })?,
        };

        let descriptor = endpoints::token_exchange(&challenge_id, code)?;
        let body = raw(self.call(descriptor, Shape::Raw).await?)?;

        // Two observed token envelopes: flat `api_key`, or nested under `token`.
        let api_key = body
            .get("api_key")
            .and_then(Value::as_str)
            .or_else(|| {
                body.get("token")
                    .and_then(|t| t.get("session_token"))
                    .and_then(Value::as_str)
            })
            .ok_or_else(|| {
                ApiError::InvalidResponse("token response is missing 'api_key'".into())
            })?
            .to_string();

        self.session.set_credential(api_key.clone()).await;
        self.session.clear_challenge().await;
        tracing::info!("auth: credential minted via pairing");

        Ok(TokenResponse { api_key })
    }

    /// Confirm that the stored credential is still accepted upstream. Cheap
    /// read (one-item spaces listing); mutates nothing on success. An upstream
    /// rejection reports `Ok(false)` — the store has already been invalidated
    /// by then. With no credential at all this fails fast like every other
    /// protected operation.
    pub async fn validate(&self) -> Result<bool, ApiError> {
        if !self.session.is_authenticated().await {
            return Err(ApiError::Unauthorized(
                "no active credential; authenticate first".into(),
            ));
        }
        let descriptor = endpoints::list_spaces(&Page { limit: 1, offset: 0 })?;
        match self.call(descriptor, Shape::List).await {
            Ok(_) => Ok(true),
            Err(ApiError::Unauthorized(_)) => Ok(false),
            Err(e) => Err(e),
        }
    }

    /// Drop the stored credential. Idempotent; no upstream call.
    pub async fn logout(&self) {
        self.session.invalidate().await;
    }

    // ── Spaces ───────────────────────────────────────────────────────────

    pub async fn list_spaces(&self, page: &Page) -> Result<Paginated<Space>, ApiError> {
        entities(self.call(endpoints::list_spaces(page)?, Shape::List).await?)
    }

    pub async fn create_space(&self, request: &CreateSpaceRequest) -> Result<Space, ApiError> {
        entity(
            self.call(endpoints::create_space(request)?, Shape::Entity("space"))
                .await?,
        )
    }

    pub async fn list_members(
        &self,
        space_id: &str,
        page: &Page,
    ) -> Result<Paginated<Member>, ApiError> {
        entities(
            self.call(endpoints::list_members(space_id, page)?, Shape::List)
                .await?,
        )
    }

    // ── Objects ──────────────────────────────────────────────────────────

    pub async fn create_object(
        &self,
        space_id: &str,
        request: &CreateObjectRequest,
    ) -> Result<AnytypeObject, ApiError> {
        entity(
            self.call(
                endpoints::create_object(space_id, request)?,
                Shape::Entity("object"),
            )
            .await?,
        )
    }

    pub async fn get_object(
        &self,
        space_id: &str,
        object_id: &str,
    ) -> Result<AnytypeObject, ApiError> {
        entity(
            self.call(
                endpoints::get_object(space_id, object_id)?,
                Shape::Entity("object"),
            )
            .await?,
        )
    }

    pub async fn list_objects(
        &self,
        space_id: &str,
        page: &Page,
    ) -> Result<Paginated<AnytypeObject>, ApiError> {
        entities(
            self.call(endpoints::list_objects(space_id, page)?, Shape::List)
                .await?,
        )
    }

    /// Archive an object. The upstream echoes the archived object back; the
    /// caller only needs the success marker.
    pub async fn delete_object(&self, space_id: &str, object_id: &str) -> Result<(), ApiError> {
        self.call(endpoints::delete_object(space_id, object_id)?, Shape::Empty)
            .await?;
        Ok(())
    }

    pub async fn export_object(
        &self,
        space_id: &str,
        object_id: &str,
        format: ExportFormat,
    ) -> Result<ObjectExportResponse, ApiError> {
        let body = raw(
            self.call(
                endpoints::export_object(space_id, object_id, format)?,
                Shape::Raw,
            )
            .await?,
        )?;
        let markdown = body
            .get("markdown")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                ApiError::InvalidResponse("export response is missing 'markdown'".into())
            })?
            .to_string();
        Ok(ObjectExportResponse { markdown })
    }

    // ── Search ───────────────────────────────────────────────────────────

    pub async fn search_objects(
        &self,
        space_id: &str,
        query: &SearchQuery,
    ) -> Result<Paginated<AnytypeObject>, ApiError> {
        entities(
            self.call(endpoints::search_objects(space_id, query)?, Shape::List)
                .await?,
        )
    }

    pub async fn global_search(
        &self,
        query: &SearchQuery,
    ) -> Result<Paginated<AnytypeObject>, ApiError> {
        entities(self.call(endpoints::global_search(query)?, Shape::List).await?)
    }

    // ── Types & templates ────────────────────────────────────────────────

    pub async fn list_types(
        &self,
        space_id: &str,
        page: &Page,
    ) -> Result<Paginated<ObjectType>, ApiError> {
        entities(
            self.call(endpoints::list_types(space_id, page)?, Shape::List)
                .await?,
        )
    }

    pub async fn list_templates(
        &self,
        space_id: &str,
        type_id: &str,
        page: &Page,
    ) -> Result<Paginated<Template>, ApiError> {
        entities(
            self.call(endpoints::list_templates(space_id, type_id, page)?, Shape::List)
                .await?,
        )
    }
}

// ---------------------------------------------------------------------------
// Payload → typed result
// ---------------------------------------------------------------------------

fn entity<T: DeserializeOwned>(payload: Payload) -> Result<T, ApiError> {
    match payload {
        Payload::Entity(value) => serde_json::from_value(value)
            .map_err(|e| ApiError::InvalidResponse(format!("entity does not deserialize: {e}"))),
        other => Err(ApiError::InvalidResponse(format!(
            "expected a single entity, got {other:?}"
        ))),
    }
}

fn entities<T: DeserializeOwned>(payload: Payload) -> Result<Paginated<T>, ApiError> {
    match payload {
        Payload::List { data, pagination } => {
            // Order is preserved exactly as the upstream returned it.
            let data = data
                .into_iter()
                .map(|item| {
                    serde_json::from_value(item).map_err(|e| {
                        ApiError::InvalidResponse(format!("list item does not deserialize: {e}"))
                    })
                })
                .collect::<Result<Vec<T>, ApiError>>()?;
            Ok(Paginated { data, pagination })
        }
        other => Err(ApiError::InvalidResponse(format!(
            "expected a list, got {other:?}"
        ))),
    }
}

fn raw(payload: Payload) -> Result<Value, ApiError> {
    match payload {
        Payload::Entity(value) => Ok(value),
        other => Err(ApiError::InvalidResponse(format!(
            "expected a flat body, got {other:?}"
        ))),
    }
}
