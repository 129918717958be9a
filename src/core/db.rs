//! Demo data for the native dev server. The wasm component starts empty.

use crate::core::errors::ApiResult;
use crate::core::helpers::hash_password;
use crate::core::kv::KvStore;
use crate::{follow, store};

/// Idempotent: a second call against a seeded store is a no-op.
pub fn seed_demo_data<S: KvStore>(kv: &S) -> ApiResult<()> {
    if store::find_user_by_username(kv, "alice")?.is_some() {
        return Ok(());
    }

    let alice = store::insert_user(kv, "alice", &hash_password("alice")?, Some("Hello, I'm Alice!".to_string()))?;
    let bob = store::insert_user(kv, "bob", &hash_password("bob")?, Some("Bob's corner of the internet".to_string()))?;

    let rust = store::insert_group(kv, "Rust", "rust", "Posts about the Rust language")?;

    store::insert_post(kv, &alice.id, "Welcome to my blog!", None, None)?;
    store::insert_post(kv, &alice.id, "Ownership finally clicked today.", Some(&rust.slug), None)?;
    let post = store::insert_post(kv, &bob.id, "Hey everyone, just joined.", None, None)?;
    store::insert_comment(kv, &post.id, &alice.id, "Welcome aboard!")?;

    follow::follow(kv, &alice.id, &bob.id)?;

    log::info!("seeded demo data");
    Ok(())
}
