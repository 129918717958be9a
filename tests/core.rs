//! End-to-end exercises of the entity store, feed engine, social graph, and
//! timeline cache over the in-memory backend. No running server required.

use std::time::Duration;

use pluma::cache::TimelineCache;
use pluma::config::token_key;
use pluma::core::errors::ApiError;
use pluma::core::helpers::now_iso;
use pluma::core::kv::{KvStore, MemKv};
use pluma::models::models::{TokenData, User};
use pluma::pagination::paginate;
use pluma::{auth, feed, follow, posts, store};

use spin_sdk::http::{Method, Request};

fn make_user(kv: &MemKv, username: &str) -> User {
    store::insert_user(kv, username, "not-a-real-hash", None).expect("insert user")
}

fn issue_token(kv: &MemKv, user_id: &str) -> String {
    let token = format!("tok-{}", user_id);
    kv.set_json(
        &token_key(&token),
        &TokenData {
            user_id: user_id.to_string(),
            created_at: now_iso(),
        },
    )
    .expect("store token");
    token
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<serde_json::Value>) -> Request {
    let mut builder = Request::builder();
    let mut b = builder.method(method).uri(uri);
    let auth_value;
    if let Some(t) = token {
        auth_value = format!("Bearer {}", t);
        b = b.header("Authorization", auth_value.as_str());
    }
    let body_vec = body
        .map(|v| serde_json::to_vec(&v).expect("serialize body"))
        .unwrap_or_default();
    b.body(body_vec).build()
}

// === Feed ordering ===

#[test]
fn index_returns_posts_newest_first() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");

    let first = store::insert_post(&kv, &alice.id, "first", None, None).unwrap();
    let second = store::insert_post(&kv, &alice.id, "second", None, None).unwrap();
    let third = store::insert_post(&kv, &alice.id, "third", None, None).unwrap();

    let index = feed::index(&kv).unwrap();
    let ids: Vec<&str> = index.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![third.id.as_str(), second.id.as_str(), first.id.as_str()]);

    // Stable across repeated queries
    let again = feed::index(&kv).unwrap();
    let ids_again: Vec<&str> = again.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, ids_again);
}

#[test]
fn index_paginates_thirteen_posts_as_ten_and_three() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");
    for i in 0..13 {
        store::insert_post(&kv, &alice.id, &format!("post {}", i), None, None).unwrap();
    }

    let index = feed::index(&kv).unwrap();
    let first = paginate(&index, 10, 1);
    let second = paginate(&index, 10, 2);
    let beyond = paginate(&index, 10, 7);

    assert_eq!(first.items.len(), 10);
    assert_eq!(second.items.len(), 3);
    assert_eq!(beyond.number, 2);
    let second_ids: Vec<&str> = second.items.iter().map(|p| p.id.as_str()).collect();
    let beyond_ids: Vec<&str> = beyond.items.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(second_ids, beyond_ids);
}

// === Social graph ===

#[test]
fn double_follow_produces_one_edge() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");
    let bob = make_user(&kv, "bob");

    follow::follow(&kv, &alice.id, &bob.id).unwrap();
    follow::follow(&kv, &alice.id, &bob.id).unwrap();

    assert!(follow::is_following(&kv, &alice.id, &bob.id).unwrap());
    assert_eq!(follow::followings(&kv, &alice.id).unwrap(), vec![bob.id.clone()]);
    assert_eq!(follow::followers(&kv, &bob.id).unwrap(), vec![alice.id.clone()]);
}

#[test]
fn self_follow_is_a_silent_no_op() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");

    follow::follow(&kv, &alice.id, &alice.id).unwrap();

    assert!(!follow::is_following(&kv, &alice.id, &alice.id).unwrap());
    assert!(follow::followings(&kv, &alice.id).unwrap().is_empty());
}

#[test]
fn unfollow_without_edge_is_not_found() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");
    let bob = make_user(&kv, "bob");

    let err = follow::unfollow(&kv, &alice.id, &bob.id).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn follow_unknown_author_is_not_found() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");

    let err = follow::follow(&kv, &alice.id, "no-such-author").unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
}

#[test]
fn is_following_is_false_for_absent_user() {
    let kv = MemKv::new();
    let bob = make_user(&kv, "bob");
    assert!(!follow::is_following(&kv, "nobody", &bob.id).unwrap());
}

#[test]
fn follow_feed_contains_only_followed_authors() {
    let kv = MemKv::new();
    let reader = make_user(&kv, "reader");
    let followed = make_user(&kv, "followed");
    let stranger = make_user(&kv, "stranger");

    follow::follow(&kv, &reader.id, &followed.id).unwrap();
    let old = store::insert_post(&kv, &followed.id, "older", None, None).unwrap();
    store::insert_post(&kv, &stranger.id, "noise", None, None).unwrap();
    let new = store::insert_post(&kv, &followed.id, "newer", None, None).unwrap();

    let posts = feed::follow_feed(&kv, &reader.id).unwrap();
    let ids: Vec<&str> = posts.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(ids, vec![new.id.as_str(), old.id.as_str()]);
}

#[test]
fn follow_feed_is_empty_when_following_no_one() {
    let kv = MemKv::new();
    let reader = make_user(&kv, "reader");
    let stranger = make_user(&kv, "stranger");
    store::insert_post(&kv, &stranger.id, "noise", None, None).unwrap();

    assert!(feed::follow_feed(&kv, &reader.id).unwrap().is_empty());
}

// === Referential integrity ===

#[test]
fn deleting_group_nulls_post_references() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");
    let group = store::insert_group(&kv, "Group One", "g1", "first group").unwrap();
    let post = store::insert_post(&kv, &alice.id, "grouped post", Some("g1"), None).unwrap();
    assert_eq!(post.group_id.as_deref(), Some(group.id.as_str()));

    store::delete_group(&kv, "g1").unwrap();

    let survivor = store::get_post(&kv, &post.id).unwrap().expect("post still queryable");
    assert_eq!(survivor.group_id, None);
    assert!(matches!(
        feed::group_feed(&kv, "g1").unwrap_err(),
        ApiError::NotFound(_)
    ));
}

#[test]
fn deleting_post_cascades_comments() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");
    let bob = make_user(&kv, "bob");
    let post = store::insert_post(&kv, &alice.id, "commented", None, None).unwrap();
    let c1 = store::insert_comment(&kv, &post.id, &bob.id, "first!").unwrap();
    let c2 = store::insert_comment(&kv, &post.id, &alice.id, "thanks").unwrap();

    store::delete_post(&kv, &post.id).unwrap();

    assert!(store::get_post(&kv, &post.id).unwrap().is_none());
    assert!(store::comments_for_post(&kv, &post.id).unwrap().is_empty());
    assert!(kv
        .get_json::<pluma::models::models::Comment>(&pluma::config::comment_key(&c1.id))
        .unwrap()
        .is_none());
    assert!(kv
        .get_json::<pluma::models::models::Comment>(&pluma::config::comment_key(&c2.id))
        .unwrap()
        .is_none());
}

#[test]
fn deleting_user_cascades_posts_and_follow_edges() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");
    let bob = make_user(&kv, "bob");
    let post = store::insert_post(&kv, &bob.id, "soon gone", None, None).unwrap();
    follow::follow(&kv, &alice.id, &bob.id).unwrap();
    follow::follow(&kv, &bob.id, &alice.id).unwrap();

    store::delete_user(&kv, &bob.id).unwrap();

    assert!(store::get_user(&kv, &bob.id).unwrap().is_none());
    assert!(store::get_post(&kv, &post.id).unwrap().is_none());
    assert!(feed::index(&kv).unwrap().is_empty());
    assert!(!follow::is_following(&kv, &alice.id, &bob.id).unwrap());
    assert!(follow::followers(&kv, &alice.id).unwrap().is_empty());
}

#[test]
fn comments_keep_insertion_order() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");
    let post = store::insert_post(&kv, &alice.id, "discuss", None, None).unwrap();
    for i in 0..5 {
        store::insert_comment(&kv, &post.id, &alice.id, &format!("comment {}", i)).unwrap();
    }

    let detail = feed::post_detail(&kv, &post.id).unwrap();
    let texts: Vec<&str> = detail.comments.iter().map(|c| c.text.as_str()).collect();
    assert_eq!(texts, vec!["comment 0", "comment 1", "comment 2", "comment 3", "comment 4"]);
    assert!(detail.comments.windows(2).all(|w| w[0].created_at <= w[1].created_at));
}

#[test]
fn post_detail_recounts_author_posts() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");
    let bob = make_user(&kv, "bob");
    let post = store::insert_post(&kv, &alice.id, "one", None, None).unwrap();
    store::insert_post(&kv, &alice.id, "two", None, None).unwrap();
    store::insert_post(&kv, &bob.id, "unrelated", None, None).unwrap();

    assert_eq!(feed::post_detail(&kv, &post.id).unwrap().author_posts_count, 2);

    store::insert_post(&kv, &alice.id, "three", None, None).unwrap();
    assert_eq!(feed::post_detail(&kv, &post.id).unwrap().author_posts_count, 3);
}

// === Validation and uniqueness ===

#[test]
fn empty_post_text_is_rejected_without_partial_write() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");

    let err = store::insert_post(&kv, &alice.id, "   ", None, None).unwrap_err();
    assert!(matches!(err, ApiError::BadRequest(_)));
    assert!(feed::index(&kv).unwrap().is_empty());
}

#[test]
fn post_into_unknown_group_is_not_found() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");

    let err = store::insert_post(&kv, &alice.id, "text", Some("no-such-group"), None).unwrap_err();
    assert!(matches!(err, ApiError::NotFound(_)));
    assert!(feed::index(&kv).unwrap().is_empty());
}

#[test]
fn duplicate_group_slug_conflicts() {
    let kv = MemKv::new();
    store::insert_group(&kv, "Group One", "g1", "first").unwrap();
    let err = store::insert_group(&kv, "Another", "g1", "second").unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[test]
fn duplicate_username_conflicts() {
    let kv = MemKv::new();
    make_user(&kv, "alice");
    let err = store::insert_user(&kv, "alice", "hash", None).unwrap_err();
    assert!(matches!(err, ApiError::Conflict(_)));
}

#[test]
fn profile_feed_for_unknown_username_is_not_found() {
    let kv = MemKv::new();
    assert!(matches!(
        feed::profile_feed(&kv, "ghost").unwrap_err(),
        ApiError::NotFound(_)
    ));
}

// === Timeline cache ===

#[test]
fn cached_index_stays_stale_until_cleared() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");
    store::insert_post(&kv, &alice.id, "original", None, None).unwrap();

    let cache = TimelineCache::new(Duration::from_secs(60));
    let key = "/posts?page=1";
    let first_render = posts::render_index_page(&kv, 1).unwrap();
    cache.put(key, first_render.clone());

    // A write inside the TTL window does not touch the cache.
    store::insert_post(&kv, &alice.id, "brand new", None, None).unwrap();
    assert_eq!(cache.get(key), Some(first_render.clone()));
    assert_eq!(cache.get(key), Some(first_render.clone()));

    cache.clear();
    assert_eq!(cache.get(key), None);
    let second_render = posts::render_index_page(&kv, 1).unwrap();
    assert_ne!(second_render, first_render);
    let parsed: serde_json::Value = serde_json::from_slice(&second_render).unwrap();
    assert_eq!(parsed["posts"].as_array().unwrap().len(), 2);
}

#[test]
fn expired_cache_entry_reflects_current_store() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");
    store::insert_post(&kv, &alice.id, "original", None, None).unwrap();

    let cache = TimelineCache::new(Duration::from_millis(30));
    let key = "/posts?page=1";
    let first_render = posts::render_index_page(&kv, 1).unwrap();
    cache.put(key, first_render.clone());

    store::insert_post(&kv, &alice.id, "brand new", None, None).unwrap();
    std::thread::sleep(Duration::from_millis(60));

    assert_eq!(cache.get(key), None);
    let second_render = posts::render_index_page(&kv, 1).unwrap();
    assert_ne!(second_render, first_render);
}

// === Handlers over HTTP types ===

#[test]
fn follow_feed_route_requires_authentication() {
    let kv = MemKv::new();
    let req = request(Method::Get, "/feed", None, None);
    let resp = pluma::handle_request(&kv, req).unwrap();
    assert_eq!(*resp.status(), 401);
}

#[test]
fn non_author_edit_redirects_to_detail() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");
    let mallory = make_user(&kv, "mallory");
    let post = store::insert_post(&kv, &alice.id, "mine", None, None).unwrap();
    let token = issue_token(&kv, &mallory.id);

    let req = request(
        Method::Put,
        &format!("/posts/{}", post.id),
        Some(&token),
        Some(serde_json::json!({"text": "hijacked"})),
    );
    let resp = pluma::handle_request(&kv, req).unwrap();

    assert_eq!(*resp.status(), 303);
    let unchanged = store::get_post(&kv, &post.id).unwrap().unwrap();
    assert_eq!(unchanged.text, "mine");
}

#[test]
fn create_post_forces_author_to_caller() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");
    let bob = make_user(&kv, "bob");
    let token = issue_token(&kv, &alice.id);

    let req = request(
        Method::Post,
        "/posts",
        Some(&token),
        Some(serde_json::json!({"text": "hello", "author_id": bob.id})),
    );
    let resp = pluma::handle_request(&kv, req).unwrap();
    assert_eq!(*resp.status(), 201);

    let created: pluma::models::models::Post = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(created.author_id, alice.id);
}

#[test]
fn profile_posts_report_follow_state() {
    let kv = MemKv::new();
    let reader = make_user(&kv, "reader");
    let author = make_user(&kv, "author");
    store::insert_post(&kv, &author.id, "a post", None, None).unwrap();
    follow::follow(&kv, &reader.id, &author.id).unwrap();
    let token = issue_token(&kv, &reader.id);

    let authed = request(Method::Get, "/users/author/posts", Some(&token), None);
    let resp = pluma::handle_request(&kv, authed).unwrap();
    assert_eq!(*resp.status(), 200);
    let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["following"], serde_json::json!(true));

    let anonymous = request(Method::Get, "/users/author/posts", None, None);
    let resp = pluma::handle_request(&kv, anonymous).unwrap();
    let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
    assert_eq!(body["following"], serde_json::json!(false));
}

#[test]
fn group_feed_route_404s_for_unknown_slug() {
    let kv = MemKv::new();
    let req = request(Method::Get, "/groups/no-such-group/posts", None, None);
    let resp = pluma::handle_request(&kv, req).unwrap();
    assert_eq!(*resp.status(), 404);
}

#[test]
fn expired_token_no_longer_validates() {
    let kv = MemKv::new();
    let alice = make_user(&kv, "alice");
    let stale = chrono::Utc::now() - chrono::Duration::hours(48);
    kv.set_json(
        &token_key("stale-token"),
        &TokenData {
            user_id: alice.id.clone(),
            created_at: stale.to_rfc3339(),
        },
    )
    .unwrap();

    let req = request(Method::Get, "/profile", Some("stale-token"), None);
    assert!(auth::validate_token(&kv, &req).is_none());
}
