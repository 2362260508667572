// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! End-to-end tests for the message bus driven through a built framework.
//!
//! A global handler subscribes local callbacks and publishes follow-up
//! payloads from inside its own dispatch, the way a launch sequence does.

use anyhow::Context;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tgf_sdk::prelude::*;

#[derive(Clone, Debug)]
struct Launch {
    data: String,
}

#[derive(Clone, Debug)]
struct InTest2 {
    value: i32,
}

#[derive(Clone, Debug)]
struct IntTest {
    value: i32,
}

type Journal = Arc<Mutex<Vec<String>>>;

fn record(journal: &Journal, line: impl Into<String>) {
    journal.lock().unwrap().push(line.into());
}

struct LaunchHandler {
    context: FrameworkContext,
    journal: Journal,
}

#[async_trait]
impl MessageHandler<Launch> for LaunchHandler {
    async fn handle(&self, msg: Launch) -> anyhow::Result<()> {
        let bus = self.context.message().context("message bus is gone")?;
        record(&self.journal, msg.data);

        let journal = Arc::clone(&self.journal);
        bus.subscribe(LocalHandler::new(move |msg: InTest2| {
            let journal = Arc::clone(&journal);
            async move {
                record(&journal, format!("InTest2 {}", msg.value));
                anyhow::Ok(())
            }
        }));
        let journal = Arc::clone(&self.journal);
        bus.subscribe(LocalHandler::new(move |msg: IntTest| {
            let journal = Arc::clone(&journal);
            async move {
                record(&journal, format!("IntTest {}", msg.value));
                anyhow::Ok(())
            }
        }));

        tokio::task::yield_now().await;
        bus.publish(InTest2 { value: 42 }).await?;
        tokio::task::yield_now().await;
        bus.publish(IntTest { value: 52 }).await?;
        Ok(())
    }
}

fn launch_framework(journal: &Journal) -> Framework {
    let journal = Arc::clone(journal);
    Framework::builder()
        .handler_with::<Launch, _, _>(move |context| {
            Ok(LaunchHandler {
                context: context.clone(),
                journal: Arc::clone(&journal),
            })
        })
        .build()
}

#[tokio::test]
async fn test_launch_sequence_reaches_local_callbacks() {
    let journal = Journal::default();
    let mut framework = launch_framework(&journal);
    framework.init_modules().unwrap();
    framework.start_modules().unwrap();

    framework
        .message()
        .publish(Launch {
            data: "launch".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(
        *journal.lock().unwrap(),
        vec!["launch", "InTest2 42", "IntTest 52"]
    );
    assert_eq!(framework.message().local_handler_count::<InTest2>(), 1);
    assert_eq!(framework.message().local_handler_count::<IntTest>(), 1);
}

#[tokio::test]
async fn test_second_launch_duplicates_local_callbacks() {
    let journal = Journal::default();
    let mut framework = launch_framework(&journal);
    framework.init_modules().unwrap();

    for _ in 0..2 {
        framework
            .message()
            .publish(Launch {
                data: "launch".to_string(),
            })
            .await
            .unwrap();
    }

    let journal = journal.lock().unwrap();
    assert_eq!(journal.iter().filter(|l| *l == "InTest2 42").count(), 3);
    assert_eq!(framework.message().local_handler_count::<InTest2>(), 2);
}

#[tokio::test]
async fn test_shutdown_drops_all_handlers() {
    let journal = Journal::default();
    let mut framework = launch_framework(&journal);
    framework.init_modules().unwrap();
    framework.start_modules().unwrap();
    framework
        .message()
        .publish(Launch {
            data: "launch".to_string(),
        })
        .await
        .unwrap();

    framework.shutdown();

    let bus = framework.message();
    assert_eq!(bus.global_handler_count::<Launch>(), 0);
    assert_eq!(bus.local_handler_count::<InTest2>(), 0);
    bus.publish(IntTest { value: 1 }).await.unwrap();
    assert_eq!(journal.lock().unwrap().len(), 3);
}

#[tokio::test]
async fn test_publish_before_init_reaches_only_local_handlers() {
    let journal = Journal::default();
    let framework = launch_framework(&journal);

    let seen = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&seen);
    framework
        .message()
        .subscribe(LocalHandler::new(move |_msg: Launch| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { anyhow::Ok(()) }
        }));

    framework
        .message()
        .publish(Launch {
            data: "early".to_string(),
        })
        .await
        .unwrap();

    assert_eq!(seen.load(Ordering::SeqCst), 1);
    assert!(journal.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_failed_handler_construction_aborts_init() {
    let mut framework = Framework::builder()
        .handler_with::<Launch, LaunchHandler, _>(|_context| {
            Err(anyhow::anyhow!("no launch pad"))
        })
        .build();

    let err = framework.init_modules().unwrap_err();
    assert!(format!("{err:#}").contains("MessageModule"));
    assert!(!framework.message().is_initialized());
}

#[tokio::test]
async fn test_handler_sees_framework_services() {
    struct ScratchHandler {
        context: FrameworkContext,
        seen: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl MessageHandler<IntTest> for ScratchHandler {
        async fn handle(&self, msg: IntTest) -> anyhow::Result<()> {
            let mut scratch: Vec<i32> = self.context.pools().obtain();
            scratch.push(msg.value);
            self.seen.fetch_add(scratch.len(), Ordering::SeqCst);
            self.context.pools().release(scratch);
            Ok(())
        }
    }

    let seen = Arc::new(AtomicUsize::new(0));
    let handler_seen = Arc::clone(&seen);
    let mut framework = Framework::builder()
        .handler_with::<IntTest, _, _>(move |context| {
            Ok(ScratchHandler {
                context: context.clone(),
                seen: Arc::clone(&handler_seen),
            })
        })
        .build();
    framework.init_modules().unwrap();

    framework.message().publish(IntTest { value: 7 }).await.unwrap();
    framework.message().publish(IntTest { value: 8 }).await.unwrap();

    // The scratch vector is cleared on release, so each publish sees one item.
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert_eq!(framework.pools().pooled::<Vec<i32>>(), 1);
}
