//! Integration tests: HTTP surface (health, auth, activities) driven
//! through the router, and the end-to-end dispatch -> hub -> store flow.
//!
//! Everything runs against the in-memory collaborators; no external
//! services are needed.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use rally::auth::JwtSecret;
use rally::dispatch::{requests, Request as AppRequest};
use rally::models::{ActivityDto, UserRecord, WsEvent, EVENT_COMMENT_RECEIVED};
use rally::repositories::{
    ActivityRepository, MemoryPhotoGateway, MemoryRepository, UserRepository,
};
use rally::store::{ActivitySlice, LiveFeed, Store};
use rally::{build_dispatcher, create_app, AppState, CommentFanout, Hub};
use tokio_util::sync::CancellationToken;
use tower::util::ServiceExt;
use uuid::Uuid;

fn test_state() -> AppState {
    let repo = Arc::new(MemoryRepository::new());
    let activities: Arc<dyn ActivityRepository> = repo.clone();
    let users: Arc<dyn UserRepository> = repo.clone();
    let photos = Arc::new(MemoryPhotoGateway::new());

    let dispatcher = Arc::new(build_dispatcher(activities, users.clone(), photos).unwrap());
    let hub = Arc::new(Hub::new());
    let fanout = Arc::new(CommentFanout::new(hub.clone()));
    let jwt_secret = JwtSecret::new("test-jwt-secret-min-32-chars!!!!".to_string(), 7);

    AppState {
        dispatcher,
        hub,
        fanout,
        users,
        jwt_secret,
    }
}

async fn body_json(res: axum::response::Response) -> serde_json::Value {
    let body = axum::body::to_bytes(res.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

/// Register a user through the API and return their bearer token.
async fn register(app: &axum::Router, username: &str) -> String {
    let body = serde_json::json!({
        "username": username,
        "display_name": username,
        "email": format!("{}@example.com", username),
        "password": "correct-horse-battery"
    });
    let req = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK, "register should succeed");
    let json = body_json(res).await;
    json["token"].as_str().unwrap().to_string()
}

fn activity_body(id: Uuid, title: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "title": title,
        "description": "an evening out",
        "category": "drinks",
        "date": "2031-05-01T19:00:00Z",
        "city": "Bristol",
        "venue": "Harbour",
    })
}

#[tokio::test]
async fn health_returns_ok() {
    let app = create_app(test_state());
    let req = Request::builder()
        .uri("/health")
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["status"], "ok");
}

#[tokio::test]
async fn register_and_login() {
    let app = create_app(test_state());
    register(&app, "bob").await;

    let login_body = serde_json::json!({
        "email": "bob@example.com",
        "password": "correct-horse-battery"
    });
    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(login_body.to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK, "login should succeed");
    let json = body_json(res).await;
    assert!(json["token"].as_str().is_some());
    assert_eq!(json["user"]["username"], "bob");

    // Wrong password is unauthorized.
    let bad = serde_json::json!({
        "email": "bob@example.com",
        "password": "wrong-password!"
    });
    let req = Request::builder()
        .method("POST")
        .uri("/auth/login")
        .header("content-type", "application/json")
        .body(Body::from(bad.to_string()))
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn activity_crud_over_http() {
    let app = create_app(test_state());
    let bob_token = register(&app, "bob").await;
    let jane_token = register(&app, "jane").await;
    let id = Uuid::new_v4();

    // Create requires auth.
    let req = Request::builder()
        .method("POST")
        .uri("/api/activities")
        .header("content-type", "application/json")
        .body(Body::from(activity_body(id, "Quiz").to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::UNAUTHORIZED);

    // Create as bob.
    let req = Request::builder()
        .method("POST")
        .uri("/api/activities")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", bob_token))
        .body(Body::from(activity_body(id, "Quiz").to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let created = body_json(res).await;
    assert_eq!(created["isHost"], true);
    assert_eq!(created["attendees"].as_array().unwrap().len(), 1);

    // Validation failure reports field errors.
    let req = Request::builder()
        .method("POST")
        .uri("/api/activities")
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", bob_token))
        .body(Body::from(activity_body(Uuid::new_v4(), "").to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    let json = body_json(res).await;
    assert!(json["fields"]["title"].is_array());

    // Jane may not edit bob's activity.
    let req = Request::builder()
        .method("PUT")
        .uri(format!("/api/activities/{}", id))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", jane_token))
        .body(Body::from(activity_body(id, "Hijacked").to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::FORBIDDEN);

    // Bob renames it.
    let req = Request::builder()
        .method("PUT")
        .uri(format!("/api/activities/{}", id))
        .header("content-type", "application/json")
        .header("authorization", format!("Bearer {}", bob_token))
        .body(Body::from(activity_body(id, "Renamed").to_string()))
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["title"], "Renamed");

    // Jane attends; list as jane shows isGoing.
    let req = Request::builder()
        .method("POST")
        .uri(format!("/api/activities/{}/attend", id))
        .header("authorization", format!("Bearer {}", jane_token))
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let req = Request::builder()
        .uri("/api/activities?limit=10")
        .header("authorization", format!("Bearer {}", jane_token))
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);
    let json = body_json(res).await;
    assert_eq!(json["activityCount"], 1);
    assert_eq!(json["activities"][0]["isGoing"], true);
    assert_eq!(json["activities"][0]["isHost"], false);

    // Bob deletes; details then 404s.
    let req = Request::builder()
        .method("DELETE")
        .uri(format!("/api/activities/{}", id))
        .header("authorization", format!("Bearer {}", bob_token))
        .body(Body::empty())
        .unwrap();
    let res = app.clone().oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::OK);

    let req = Request::builder()
        .uri(format!("/api/activities/{}", id))
        .body(Body::empty())
        .unwrap();
    let res = app.oneshot(req).await.unwrap();
    assert_eq!(res.status(), StatusCode::NOT_FOUND);
}

async fn seeded_principals(
    repo: &Arc<MemoryRepository>,
) -> (rally::models::Principal, rally::models::Principal) {
    for name in ["bob", "jane"] {
        repo.create(UserRecord {
            id: Uuid::new_v4(),
            username: name.into(),
            display_name: name.into(),
            email: format!("{}@example.com", name),
            password_hash: "x".into(),
            bio: None,
            photos: vec![],
        })
        .await
        .unwrap();
    }
    let bob = repo.find_by_username("bob").await.unwrap().unwrap();
    let jane = repo.find_by_username("jane").await.unwrap().unwrap();
    (bob.principal(), jane.principal())
}

/// The full loop: commands through the dispatcher, replies reconciled into
/// the client-side store, policy denials for non-hosts.
#[tokio::test]
async fn end_to_end_activity_lifecycle_through_store() {
    let repo = Arc::new(MemoryRepository::new());
    let (bob, jane) = seeded_principals(&repo).await;
    let dispatcher = build_dispatcher(
        repo.clone(),
        repo.clone(),
        Arc::new(MemoryPhotoGateway::new()),
    )
    .unwrap();
    let cancel = CancellationToken::new();

    let store = Arc::new(Store::new());
    let slice = ActivitySlice::new(store.clone());

    // Host creates the activity; the client puts the reply in the store.
    let uuid1 = Uuid::new_v4();
    let dto = dispatcher
        .dispatch(
            Some(&bob),
            AppRequest::CreateActivity(requests::CreateActivity {
                id: uuid1,
                title: "Quiz night".into(),
                description: "weekly quiz".into(),
                category: "drinks".into(),
                date: chrono::Utc::now() + chrono::Duration::days(3),
                city: "Bristol".into(),
                venue: "Harbour".into(),
            }),
            &cancel,
        )
        .await
        .unwrap()
        .into_activity()
        .unwrap();
    slice.upsert(&dto);
    slice.set_current(&dto);

    let listed = slice.activities();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, uuid1);
    assert!(listed[0].is_host);
    assert_eq!(listed[0].attendees.len(), 1);
    assert!(listed[0].attendees[0].is_host);

    // A different principal editing it is forbidden.
    let err = dispatcher
        .dispatch(
            Some(&jane),
            AppRequest::EditActivity(requests::EditActivity {
                id: uuid1,
                title: "X".into(),
                description: "weekly quiz".into(),
                category: "drinks".into(),
                date: chrono::Utc::now() + chrono::Duration::days(3),
                city: "Bristol".into(),
                venue: "Harbour".into(),
            }),
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, rally::AppError::Forbidden(_)));

    // The host renames it to "X"; the store view follows.
    let dto = dispatcher
        .dispatch(
            Some(&bob),
            AppRequest::EditActivity(requests::EditActivity {
                id: uuid1,
                title: "X".into(),
                description: "weekly quiz".into(),
                category: "drinks".into(),
                date: chrono::Utc::now() + chrono::Duration::days(3),
                city: "Bristol".into(),
                venue: "Harbour".into(),
            }),
            &cancel,
        )
        .await
        .unwrap()
        .into_activity()
        .unwrap();
    slice.upsert(&dto);
    assert_eq!(slice.current().unwrap().title, "X");

    // The host deletes it; it disappears from the store list.
    dispatcher
        .dispatch(
            Some(&bob),
            AppRequest::DeleteActivity(requests::DeleteActivity { id: uuid1 }),
            &cancel,
        )
        .await
        .unwrap();
    slice.remove(uuid1);
    assert!(slice.activities().iter().all(|a| a.id != uuid1));
    assert!(slice.current().is_none());
}

/// Comment command -> fanout -> hub -> each member's live feed -> store.
#[tokio::test]
async fn comment_flows_from_command_to_group_members_stores() {
    let repo = Arc::new(MemoryRepository::new());
    let (bob, jane) = seeded_principals(&repo).await;
    let dispatcher = build_dispatcher(
        repo.clone(),
        repo.clone(),
        Arc::new(MemoryPhotoGateway::new()),
    )
    .unwrap();
    let hub = Arc::new(Hub::new());
    let fanout = CommentFanout::new(hub.clone());
    let cancel = CancellationToken::new();

    // Host creates the activity both members view.
    let activity_id = Uuid::new_v4();
    let dto = dispatcher
        .dispatch(
            Some(&bob),
            AppRequest::CreateActivity(requests::CreateActivity {
                id: activity_id,
                title: "Gig".into(),
                description: "live set".into(),
                category: "music".into(),
                date: chrono::Utc::now() + chrono::Duration::days(1),
                city: "Leeds".into(),
                venue: "Arena".into(),
            }),
            &cancel,
        )
        .await
        .unwrap()
        .into_activity()
        .unwrap();

    // Two clients, each with its own store, join the activity's group; a
    // third watches a different activity.
    let (tx1, mut rx1) = tokio::sync::mpsc::unbounded_channel::<WsEvent>();
    let (tx2, mut rx2) = tokio::sync::mpsc::unbounded_channel::<WsEvent>();
    let (tx3, mut rx3) = tokio::sync::mpsc::unbounded_channel::<WsEvent>();
    hub.connect("c1", Some(bob.clone()), tx1).await;
    hub.connect("c2", Some(jane.clone()), tx2).await;
    hub.connect("c3", Some(jane.clone()), tx3).await;
    hub.join("c1", &activity_id.to_string()).await.unwrap();
    hub.join("c2", &activity_id.to_string()).await.unwrap();
    hub.join("c3", &Uuid::new_v4().to_string()).await.unwrap();

    let store1 = Arc::new(Store::new());
    let store2 = Arc::new(Store::new());
    let slice1 = ActivitySlice::new(store1.clone());
    let slice2 = ActivitySlice::new(store2.clone());
    slice1.set_current(&dto);
    slice2.set_current(&dto);
    let feed1 = LiveFeed::new(store1.clone());
    let feed2 = LiveFeed::new(store2.clone());

    // Drain the join notices.
    while rx1.try_recv().is_ok() {}
    while rx2.try_recv().is_ok() {}
    while rx3.try_recv().is_ok() {}

    // Jane comments; the command commits, then fanout pushes to the group.
    let comment = dispatcher
        .dispatch(
            Some(&jane),
            AppRequest::CreateComment(requests::CreateComment {
                activity_id,
                body: "save me a seat".into(),
            }),
            &cancel,
        )
        .await
        .unwrap()
        .into_comment()
        .unwrap();
    fanout.comment_created(activity_id, &comment).await;

    // Both group members receive exactly one push, the outsider none.
    let event1 = rx1.try_recv().unwrap();
    let event2 = rx2.try_recv().unwrap();
    assert!(rx1.try_recv().is_err());
    assert!(rx2.try_recv().is_err());
    assert!(rx3.try_recv().is_err());
    assert_eq!(event1.event, EVENT_COMMENT_RECEIVED);
    assert_eq!(event1, event2);

    // Each client's feed reconciles the push into its store.
    feed1.apply(&event1);
    feed2.apply(&event2);
    for slice in [&slice1, &slice2] {
        let current: ActivityDto = slice.current().unwrap();
        assert_eq!(current.comments.len(), 1);
        assert_eq!(current.comments[0].body, "save me a seat");
        assert_eq!(current.comments[0].author, "jane");
    }
}
