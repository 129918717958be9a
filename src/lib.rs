//! pluma: a blog-style publishing platform. Posts, groups, comments, and a
//! follow graph feeding per-user timelines, over a key-value store.

pub mod auth;
pub mod cache;
pub mod config;
pub mod core;
pub mod feed;
pub mod follow;
pub mod groups;
pub mod models;
pub mod pagination;
pub mod posts;
pub mod store;
pub mod users;

use crate::core::kv::KvStore;
use spin_sdk::http::{Request, Response};

/// Single routing table shared by the Spin component and the native dev
/// server.
pub fn handle_request<S: KvStore>(kv: &S, req: Request) -> anyhow::Result<Response> {
    let method = req.method().to_string();
    let path = req.path().to_string();

    match (method.as_str(), path.as_str()) {
        ("POST", "/users") => users::create_user(kv, req),
        ("POST", "/login") => auth::login_user(kv, req),
        ("POST", "/logout") => auth::logout_user(kv, req),
        ("GET", "/profile") => users::get_profile(kv, req),
        ("DELETE", "/profile") => users::delete_profile(kv, req),
        ("GET", "/posts") => posts::list_posts(kv, req),
        ("POST", "/posts") => posts::create_post(kv, req),
        ("GET", "/groups") => groups::list_groups(kv, req),
        ("POST", "/groups") => groups::create_group(kv, req),
        ("GET", "/feed") => posts::follow_feed(kv, req),
        ("POST", "/follow") => follow::handle_follow(kv, req),
        ("POST", "/unfollow") => follow::handle_unfollow(kv, req),
        ("DELETE", "/cache") => posts::clear_index_cache(kv, req),
        ("POST", p) if p.starts_with("/posts/") && p.ends_with("/comments") => {
            posts::add_comment(kv, req)
        }
        ("GET", p) if p.starts_with("/posts/") => posts::post_detail(kv, req),
        ("PUT", p) if p.starts_with("/posts/") => posts::edit_post(kv, req),
        ("DELETE", p) if p.starts_with("/posts/") => posts::delete_post(kv, req),
        ("GET", p) if p.starts_with("/groups/") && p.ends_with("/posts") => {
            groups::group_posts(kv, req)
        }
        ("DELETE", p) if p.starts_with("/groups/") => groups::delete_group(kv, req),
        ("GET", p) if p.starts_with("/users/") && p.ends_with("/posts") => {
            users::profile_posts(kv, req)
        }
        ("GET", p) if p.starts_with("/users/") && p.len() > 7 => users::get_user_details(kv, req),
        ("GET", p) if p.starts_with("/followings/") => follow::followings_list(kv, p),
        ("GET", p) if p.starts_with("/followers/") => follow::followers_list(kv, p),
        _ => Ok(Response::builder().status(404).body("Not found").build()),
    }
}

#[cfg(target_arch = "wasm32")]
mod component {
    use super::*;
    use crate::core::kv::SpinKv;
    use spin_sdk::http::IntoResponse;
    use spin_sdk::http_component;

    #[http_component]
    fn handle(req: Request) -> anyhow::Result<impl IntoResponse> {
        let kv = SpinKv::open_default()?;
        handle_request(&kv, req)
    }
}
