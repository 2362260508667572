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

//! Launch demo.
//!
//! A global handler for [`Launch`] subscribes two local callbacks, then
//! publishes an [`InTest2`] and an [`IntTest`] a little later while the
//! framework keeps ticking its modules. Pass a RON config path as the first
//! argument to override the defaults.

use anyhow::{Context, Result};
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;
use tgf_sdk::prelude::*;

const FRAME: Duration = Duration::from_millis(16);
const STEP_DELAY: Duration = Duration::from_millis(500);

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

#[derive(Clone, Debug)]
struct LaunchComplete;

struct LaunchHandler {
    context: FrameworkContext,
}

#[async_trait]
impl MessageHandler<Launch> for LaunchHandler {
    async fn handle(&self, msg: Launch) -> Result<()> {
        let bus = self.context.message().context("message bus is gone")?;
        log::info!("{}", msg.data);

        bus.subscribe(LocalHandler::new(|msg: InTest2| async move {
            log::info!("Local callback received InTest2: {}", msg.value);
            anyhow::Ok(())
        }));
        bus.subscribe(LocalHandler::new(|msg: IntTest| async move {
            log::info!("Local callback received IntTest: {}", msg.value);
            anyhow::Ok(())
        }));

        tokio::time::sleep(STEP_DELAY).await;
        bus.publish(InTest2 { value: 42 }).await?;

        tokio::time::sleep(STEP_DELAY).await;
        bus.publish(IntTest { value: 52 }).await?;

        tokio::task::yield_now().await;
        bus.publish(LaunchComplete).await?;
        Ok(())
    }
}

#[derive(Default)]
struct LaunchCompleteHandler;

#[async_trait]
impl MessageHandler<LaunchComplete> for LaunchCompleteHandler {
    async fn handle(&self, _msg: LaunchComplete) -> Result<()> {
        log::info!("Launch sequence complete");
        Ok(())
    }
}

register_handler!(LaunchComplete => LaunchCompleteHandler);

#[derive(Default)]
struct FrameCounter {
    frames: u64,
    fixed_steps: u64,
}

impl GameModule for FrameCounter {
    fn name(&self) -> &'static str {
        "FrameCounter"
    }

    fn on_update(&mut self, _dt: Duration) {
        self.frames += 1;
    }

    fn on_fixed_update(&mut self, _dt: Duration) {
        self.fixed_steps += 1;
    }

    fn on_stop(&mut self) {
        log::info!(
            "FrameCounter: {} frame(s), {} fixed step(s)",
            self.frames,
            self.fixed_steps
        );
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => FrameworkConfig::load(&path)
            .with_context(|| format!("loading configuration from {path}"))?,
        None => FrameworkConfig::default(),
    };
    init_logging(&config.logging);

    let mut framework = Framework::builder()
        .config(config)
        .module(10, FrameCounter::default())
        .handler_with::<Launch, _, _>(|context| {
            Ok(LaunchHandler {
                context: context.clone(),
            })
        })
        .discover_handlers()
        .build();

    framework.init_modules()?;
    framework.start_modules()?;

    let bus = Arc::clone(framework.message());
    let launch = tokio::spawn(async move {
        bus.publish(Launch {
            data: "Launching...".to_string(),
        })
        .await
    });

    let mut ticker = tokio::time::interval(FRAME);
    while !launch.is_finished() {
        ticker.tick().await;
        framework.update(FRAME);
    }
    launch.await??;

    framework.shutdown();
    Ok(())
}
