//! # Request Flow
//!
//! What every RPC handler does with an inbound call:
//!
//! ```text
//! inbound metadata ──from_inbound──→ RequestContext ──for_service──→ handler context
//!                                                                      │
//!                                  authorized(ctx, authorizer, token, privileges, call)
//!                                                                      │
//!                         ResponseEnvelope ──rewrite──→ RpcResponse (bytes on the wire)
//! ```

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use serde_json::{json, Value};
    use std::time::Duration;

    use shared_types::context::{keys, service};
    use shared_types::response::{status_code, status_message};
    use shared_types::rpc::privilege;
    use shared_types::{
        authorized, rewrite, AuthError, Authorizer, HeaderMap, Metadata, RequestContext,
        ResponseEnvelope, STANDARD_HEADERS,
    };

    // =========================================================================
    // TEST FIXTURES
    // =========================================================================

    /// Session store stand-in: `admin-token` may configure managers,
    /// `readonly-token` may only log in, `outage` fails the lookup.
    struct SessionAuthorizer;

    #[async_trait]
    impl Authorizer for SessionAuthorizer {
        async fn authorize(
            &self,
            session_token: &str,
            privileges: &[&str],
            _oem_privileges: &[&str],
        ) -> Result<ResponseEnvelope, AuthError> {
            let granted: &[&str] = match session_token {
                "admin-token" => &[privilege::LOGIN, privilege::CONFIGURE_MANAGER],
                "readonly-token" => &[privilege::LOGIN],
                "outage" => {
                    return Err(AuthError::Unavailable("session store unreachable".into()))
                }
                _ => return Ok(ResponseEnvelope::invalid_session("unknown session")),
            };

            if privileges.iter().all(|p| granted.contains(p)) {
                Ok(ResponseEnvelope::success(Value::Null))
            } else {
                Ok(ResponseEnvelope::general_error(
                    status_code::FORBIDDEN,
                    status_message::INSUFFICIENT_PRIVILEGE,
                    "insufficient privilege",
                ))
            }
        }
    }

    fn inbound_metadata() -> Metadata {
        [
            (keys::TRANSACTION_ID, "3bd1f589-117a-4cf9-89f2-da44ee8e012b"),
            (keys::ACTION_ID, "205"),
            (keys::ACTION_NAME, "GetManager"),
            (keys::THREAD_ID, "0"),
            (keys::THREAD_NAME, "api"),
            (keys::PROCESS_NAME, "api-7d9c6b5f4-x2x8l"),
        ]
        .into_iter()
        .collect()
    }

    /// Simulated manager lookup behind the authorization gate.
    async fn get_manager(
        ctx: &RequestContext,
        session_token: &str,
        backend_up: bool,
    ) -> ResponseEnvelope {
        authorized(
            ctx,
            &SessionAuthorizer,
            session_token,
            &[privilege::LOGIN],
            || async move {
                if backend_up {
                    Ok(ResponseEnvelope::success(json!({
                        "@odata.id": "/redfish/v1/Managers/1",
                        "Name": "odimra"
                    })))
                } else {
                    Err("database connection refused")
                }
            },
        )
        .await
    }

    fn body_json(body: &[u8]) -> Value {
        serde_json::from_slice(body).unwrap()
    }

    // =========================================================================
    // INTEGRATION TESTS
    // =========================================================================

    #[tokio::test]
    async fn test_context_crosses_service_boundary() {
        let inbound = inbound_metadata();
        let ctx = RequestContext::from_inbound(&inbound)
            .for_service(service::MANAGER_SERVICE, "managers-5b8f9c-abcde");

        let outbound = ctx.to_outbound();
        assert_eq!(outbound.first(keys::TRANSACTION_ID), inbound.first(keys::TRANSACTION_ID));
        assert_eq!(outbound.first(keys::ACTION_NAME), Some("GetManager"));
        assert_eq!(outbound.first(keys::THREAD_NAME), Some(service::MANAGER_SERVICE));
        assert_eq!(outbound.first(keys::PROCESS_NAME), Some("managers-5b8f9c-abcde"));
    }

    #[tokio::test]
    async fn test_background_work_outlives_request_deadline() {
        let ctx = RequestContext::from_inbound(&inbound_metadata())
            .with_timeout(Duration::from_millis(1));
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(ctx.is_expired());

        let background = ctx.rebase();
        assert!(!background.is_expired());
        assert_eq!(background.to_outbound(), ctx.to_outbound());
    }

    #[tokio::test]
    async fn test_missing_transaction_id_propagates_nothing() {
        let mut inbound = inbound_metadata();
        inbound.insert(keys::TRANSACTION_ID, "");

        let ctx = RequestContext::from_inbound(&inbound)
            .for_service(service::SYSTEM_SERVICE, "systems-0");

        assert!(ctx.is_empty());
        assert!(ctx.to_outbound().is_empty());
    }

    #[tokio::test]
    async fn test_authorized_call_reaches_the_wire() {
        let ctx = RequestContext::from_inbound(&inbound_metadata());

        let wire = rewrite(get_manager(&ctx, "admin-token", true).await);

        assert_eq!(wire.status_code, 200);
        assert_eq!(wire.status_message, status_message::SUCCESS);
        assert_eq!(body_json(&wire.body)["@odata.id"], "/redfish/v1/Managers/1");
        for (name, value) in STANDARD_HEADERS {
            assert_eq!(wire.header.get(name).map(String::as_str), Some(value));
        }
    }

    #[tokio::test]
    async fn test_failures_become_redfish_errors() {
        let ctx = RequestContext::from_inbound(&inbound_metadata());

        let unknown = rewrite(get_manager(&ctx, "stolen-token", true).await);
        assert_eq!(unknown.status_code, 401);

        let outage = rewrite(get_manager(&ctx, "outage", true).await);
        assert_eq!(outage.status_code, 401);
        assert_eq!(outage.status_message, status_message::NO_VALID_SESSION);
        assert_eq!(
            body_json(&outage.body)["error"]["@Message.ExtendedInfo"][0]["Message"],
            "authorization service unavailable: session store unreachable"
        );

        let backend_down = rewrite(get_manager(&ctx, "admin-token", false).await);
        assert_eq!(backend_down.status_code, 500);
        assert_eq!(
            body_json(&backend_down.body)["error"]["@Message.ExtendedInfo"][0]["Message"],
            "database connection refused"
        );
    }

    #[tokio::test]
    async fn test_insufficient_privilege_is_returned_unchanged() {
        let ctx = RequestContext::from_inbound(&inbound_metadata());

        let response = authorized(
            &ctx,
            &SessionAuthorizer,
            "readonly-token",
            &[privilege::CONFIGURE_MANAGER],
            || async { Ok::<_, String>(ResponseEnvelope::success(Value::Null)) },
        )
        .await;

        assert_eq!(response.status_code, status_code::FORBIDDEN);
        assert_eq!(response.status_message, status_message::INSUFFICIENT_PRIVILEGE);
    }

    #[tokio::test]
    async fn test_caller_headers_override_standard_ones() {
        let mut params = HeaderMap::new();
        params.insert("Content-type".to_string(), "text/plain".to_string());
        params.insert("Location".to_string(), "/redfish/v1/TaskService/Tasks/T1".to_string());

        let wire = rewrite(ResponseEnvelope::success(b"ok".to_vec()).with_headers(&params));

        assert_eq!(wire.body, b"ok");
        assert_eq!(wire.header["Content-type"], "text/plain");
        assert_eq!(wire.header["Location"], "/redfish/v1/TaskService/Tasks/T1");
        assert_eq!(wire.header["OData-Version"], "4.0");
    }
}
