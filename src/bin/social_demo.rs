//! Walks three players through requests, blocks and the friend limit on an
//! in-memory SQLite store, printing each result and the events it produced.

use chrono::Utc;
use quickfriends::application_impl::*;
use quickfriends::application_port::*;
use quickfriends::domain_model::*;
use quickfriends::infra_sqlite::SqliteSocialStore;
use quickfriends::logger::*;
use quickfriends::server::*;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

fn player(name: &str) -> PlayerHandle {
    PlayerHandle::new(PlayerId(uuid::Uuid::new_v4()), name, "demo", Utc::now())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let logger = Logger::new_bootstrap();
    logger.reload_from_config(&LogConfig {
        filter: "quickfriends=debug,info".to_string(),
    })?;

    let cancel = CancellationToken::new();
    let events = Arc::new(BroadcastEventSink::new(64));
    let journal = tokio::spawn(EventJournal::new(events.subscribe(), cancel.clone()).run());

    let service = RealSocialService::new(
        Arc::new(SqliteSocialStore::in_memory().await?),
        Arc::new(TokioScheduler::new(Handle::current(), cancel.child_token())),
        events,
        Arc::new(SystemClock),
        SocialConfig {
            friend_request_duration: Duration::from_secs(60),
            max_friends: FriendLimit::AtMost(1),
            default_preferences: UserPreferences::default(),
        },
    );

    let (first, second, third) = (player("first"), player("second"), player("third"));

    println!("first -> second: {:?}", service.add_friend(&first, &second).await?);
    println!("first -> third: {:?}", service.add_friend(&first, &third).await?);
    println!("second -> first: {:?}", service.add_friend(&second, &first).await?);
    println!("third -> first: {:?}", service.add_friend(&third, &first).await?);
    println!("third blocks first: {:?}", service.block_player(&third, &first).await?);
    println!("first -> third: {:?}", service.add_friend(&first, &third).await?);
    println!(
        "third unblocks first: {:?}",
        service.unblock_player(third.id, first.id).await?
    );

    for friendship in service.list_friends(first.id).await? {
        println!("first is friends with {}", friendship.other(first.id).username);
    }

    cancel.cancel();
    println!("events logged: {}", journal.await?);
    Ok(())
}
