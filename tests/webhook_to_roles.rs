//! Integration test for the webhook-to-roles pipeline.
//!
//! Verifies the end-to-end flow:
//! 1. A signed Stripe delivery hits the webhook route
//! 2. The event is recorded idempotently and reconciled into a grant
//! 3. Reconciliation enqueues a subject-scoped sync request
//! 4. The sync worker converges the member's platform roles
//!
//! Uses in-memory adapters so the whole pipeline runs without external
//! dependencies.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use hmac::{Hmac, Mac};
use secrecy::SecretString;
use sha2::Sha256;
use tower::ServiceExt;

use guildpass::adapters::http::{webhook_routes, WebhookAppState};
use guildpass::adapters::memory::{
    InMemoryAuditLog, InMemoryCatalogRepository, InMemoryCustomerLinkRepository,
    InMemoryGrantRepository, InMemoryPlatformGateway, InMemoryProviderEventStore,
    InMemorySyncQueue, RoleCall,
};
use guildpass::adapters::providers::StripeNormalizer;
use guildpass::application::handlers::{
    ApplyProviderEventHandler, DesiredRolesQuery, IngestProviderEventHandler,
};
use guildpass::application::workers::{RoleSyncWorker, RoleSyncWorkerConfig};
use guildpass::domain::catalog::{EntitlementPolicy, Group, ProcessorRefs, Tier};
use guildpass::domain::entitlement::GrantStatus;
use guildpass::domain::foundation::{GroupId, RoleId, SubjectId, TierId, Timestamp};
use guildpass::domain::provider::Provider;
use guildpass::domain::sync::{GroupRole, SyncRequestStatus};
use guildpass::ports::{
    ActorContext, CatalogRepository as _, CustomerLink, CustomerLinkRepository as _,
    GrantRepository as _, Member, ProcessingStatus, SyncQueue as _,
};

const SIGNING_SECRET: &str = "whsec_pipeline_test";

fn group_id() -> GroupId {
    GroupId::new("812345678901234567").unwrap()
}

fn subject_id() -> SubjectId {
    SubjectId::new("100000000000000001").unwrap()
}

fn gold_role() -> RoleId {
    RoleId::new("900000000000000001").unwrap()
}

fn stripe_signature(payload: &str, timestamp: i64) -> String {
    let mut mac = Hmac::<Sha256>::new_from_slice(SIGNING_SECRET.as_bytes()).unwrap();
    mac.update(format!("{timestamp}.{payload}").as_bytes());
    format!(
        "t={timestamp},v1={}",
        hex::encode(mac.finalize().into_bytes())
    )
}

struct Pipeline {
    store: Arc<InMemoryProviderEventStore>,
    grants: Arc<InMemoryGrantRepository>,
    queue: Arc<InMemorySyncQueue>,
    platform: Arc<InMemoryPlatformGateway>,
    state: WebhookAppState,
    worker: RoleSyncWorker,
}

async fn pipeline() -> Pipeline {
    let store = Arc::new(InMemoryProviderEventStore::new());
    let grants = Arc::new(InMemoryGrantRepository::new());
    let links = Arc::new(InMemoryCustomerLinkRepository::new());
    let catalog = Arc::new(InMemoryCatalogRepository::new());
    let queue = Arc::new(InMemorySyncQueue::new());
    let audit = Arc::new(InMemoryAuditLog::new());
    let platform = Arc::new(InMemoryPlatformGateway::new());

    catalog
        .upsert_group(&Group::new(group_id(), "Rust Guild"))
        .await
        .unwrap();
    catalog
        .upsert_tier(
            &Tier::new(
                TierId::new(),
                group_id(),
                "Gold",
                vec![gold_role()],
                EntitlementPolicy::Subscription { grace_days: 3 },
                ProcessorRefs {
                    stripe_price_ids: vec!["price_gold".into()],
                    ..Default::default()
                },
            )
            .unwrap(),
        )
        .await
        .unwrap();
    links
        .save(&CustomerLink::new(
            Provider::Stripe,
            "cus_1",
            group_id(),
            subject_id(),
        ))
        .await
        .unwrap();

    platform
        .set_roles(
            &group_id(),
            vec![GroupRole {
                id: gold_role(),
                name: "Gold".into(),
                position: 3,
            }],
        )
        .await;
    platform
        .set_actor(
            &group_id(),
            ActorContext {
                can_manage_roles: true,
                top_role_position: 10,
            },
        )
        .await;
    platform
        .add_member(
            &group_id(),
            Member {
                subject_id: subject_id(),
                role_ids: vec![],
            },
        )
        .await;

    let apply = Arc::new(ApplyProviderEventHandler::new(
        grants.clone(),
        links,
        catalog.clone(),
        queue.clone(),
        audit.clone(),
    ));
    let ingest = Arc::new(IngestProviderEventHandler::new(store.clone(), apply));
    let state = WebhookAppState::new(ingest).with_normalizer(Arc::new(StripeNormalizer::new(
        SecretString::new(SIGNING_SECRET.to_string()),
    )));

    let worker = RoleSyncWorker::new(
        queue.clone(),
        catalog.clone(),
        platform.clone(),
        audit,
        DesiredRolesQuery::new(grants.clone(), catalog),
        RoleSyncWorkerConfig {
            tick_interval: std::time::Duration::from_millis(10),
            subject_delay: std::time::Duration::from_millis(0),
            ..Default::default()
        },
    );

    Pipeline {
        store,
        grants,
        queue,
        platform,
        state,
        worker,
    }
}

async fn deliver(state: &WebhookAppState, payload: &str) -> StatusCode {
    let app = webhook_routes().with_state(state.clone());
    let signature = stripe_signature(payload, Timestamp::now().as_unix_secs());
    app.oneshot(
        Request::builder()
            .method("POST")
            .uri("/stripe")
            .header("stripe-signature", signature)
            .body(Body::from(payload.to_string()))
            .unwrap(),
    )
    .await
    .unwrap()
    .status()
}

fn invoice_paid_payload(event_id: &str) -> String {
    serde_json::json!({
        "id": event_id,
        "type": "invoice.paid",
        "data": {"object": {
            "id": "in_1",
            "customer": "cus_1",
            "subscription": "sub_1",
            "lines": {"data": [
                {"price": {"id": "price_gold"},
                 "period": {"end": Timestamp::now().add_days(30).as_unix_secs()}}
            ]}
        }}
    })
    .to_string()
}

#[tokio::test]
async fn signed_delivery_creates_a_grant_and_converges_roles() {
    let p = pipeline().await;

    let status = deliver(&p.state, &invoice_paid_payload("evt_1")).await;
    assert_eq!(status, StatusCode::OK);

    // Event recorded and reconciled.
    let records = p.store.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].status, ProcessingStatus::Processed);

    // An effective grant exists for the subject.
    let grants = p
        .grants
        .find_for_subject(&group_id(), &subject_id())
        .await
        .unwrap();
    assert_eq!(grants.len(), 1);
    assert_eq!(grants[0].status, GrantStatus::Active);
    assert!(grants[0].is_effective(Timestamp::now()));

    // Reconciliation queued a subject-scoped sync; one tick converges it.
    assert_eq!(p.queue.pending_count(&group_id()).await.unwrap(), 1);
    let processed = p.worker.process_tick().await.unwrap();
    assert_eq!(processed, 1);

    assert_eq!(
        p.platform.calls().await,
        vec![RoleCall::Add {
            subject_id: subject_id(),
            role_id: gold_role(),
        }]
    );
}

#[tokio::test]
async fn redelivered_event_does_not_double_apply() {
    let p = pipeline().await;
    let payload = invoice_paid_payload("evt_1");

    assert_eq!(deliver(&p.state, &payload).await, StatusCode::OK);
    assert_eq!(deliver(&p.state, &payload).await, StatusCode::OK);

    assert_eq!(p.store.records().await.len(), 1);
    let grants = p
        .grants
        .find_for_subject(&group_id(), &subject_id())
        .await
        .unwrap();
    assert_eq!(grants.len(), 1);
    // The duplicate did not enqueue a second sync request.
    assert_eq!(p.queue.pending_count(&group_id()).await.unwrap(), 1);
}

#[tokio::test]
async fn cancellation_revokes_the_grant_and_removes_the_role() {
    let p = pipeline().await;

    assert_eq!(
        deliver(&p.state, &invoice_paid_payload("evt_1")).await,
        StatusCode::OK
    );
    p.worker.process_tick().await.unwrap();

    let canceled = serde_json::json!({
        "id": "evt_2",
        "type": "customer.subscription.deleted",
        "data": {"object": {
            "id": "sub_1",
            "customer": "cus_1",
            "status": "canceled"
        }}
    })
    .to_string();
    assert_eq!(deliver(&p.state, &canceled).await, StatusCode::OK);

    let grants = p
        .grants
        .find_for_subject(&group_id(), &subject_id())
        .await
        .unwrap();
    assert_eq!(grants[0].status, GrantStatus::Canceled);

    p.worker.process_tick().await.unwrap();
    let calls = p.platform.calls().await;
    assert_eq!(
        calls.last(),
        Some(&RoleCall::Remove {
            subject_id: subject_id(),
            role_id: gold_role(),
        })
    );

    // Both sync requests finished cleanly.
    let requests = p.queue.all().await;
    assert_eq!(requests.len(), 2);
    assert!(requests
        .iter()
        .all(|r| r.status == SyncRequestStatus::Completed));
}
