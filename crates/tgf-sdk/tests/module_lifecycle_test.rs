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

//! Integration tests for module discovery and the framework lifecycle.

use std::any::Any;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tgf_sdk::prelude::*;

type Journal = Arc<Mutex<Vec<String>>>;

macro_rules! recording_module {
    ($($name:ident),*) => {
        $(
            struct $name {
                journal: Journal,
            }

            impl GameModule for $name {
                fn name(&self) -> &'static str {
                    stringify!($name)
                }

                fn on_init(&mut self) -> anyhow::Result<()> {
                    self.log("init");
                    Ok(())
                }

                fn on_start(&mut self) -> anyhow::Result<()> {
                    self.log("start");
                    Ok(())
                }

                fn on_update(&mut self, _dt: Duration) {
                    self.log("update");
                }

                fn on_late_update(&mut self, _dt: Duration) {
                    self.log("late");
                }

                fn on_fixed_update(&mut self, _dt: Duration) {
                    self.log("fixed");
                }

                fn on_stop(&mut self) {
                    self.log("stop");
                }

                fn as_any(&self) -> &dyn Any {
                    self
                }

                fn as_any_mut(&mut self) -> &mut dyn Any {
                    self
                }
            }

            impl $name {
                fn new(journal: &Journal) -> Self {
                    Self {
                        journal: Arc::clone(journal),
                    }
                }

                fn log(&self, hook: &str) {
                    self.journal
                        .lock()
                        .unwrap()
                        .push(format!("{}:{hook}", stringify!($name)));
                }
            }
        )*
    };
}

recording_module!(Audio, Input, Physics, Ui);

struct Broken;

impl GameModule for Broken {
    fn on_init(&mut self) -> anyhow::Result<()> {
        Err(anyhow::anyhow!("device unavailable"))
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

fn drain(journal: &Journal) -> Vec<String> {
    std::mem::take(&mut *journal.lock().unwrap())
}

#[test]
fn test_modules_register_by_ascending_priority() {
    let journal = Journal::default();
    let framework = Framework::builder()
        .message_priority(2)
        .module(5, Audio::new(&journal))
        .module(1, Input::new(&journal))
        .module(5, Physics::new(&journal))
        .module(3, Ui::new(&journal))
        .build();

    assert_eq!(
        framework.module_names(),
        vec!["Input", "MessageModule", "Ui", "Audio", "Physics"]
    );
}

#[test]
fn test_full_lifecycle_order() {
    let journal = Journal::default();
    let mut framework = Framework::builder()
        .module(2, Audio::new(&journal))
        .module(1, Input::new(&journal))
        .build();

    framework.init_modules().unwrap();
    framework.start_modules().unwrap();
    assert_eq!(
        drain(&journal),
        vec!["Input:init", "Audio:init", "Input:start", "Audio:start"]
    );

    framework.update(Duration::from_millis(20));
    assert_eq!(
        drain(&journal),
        vec![
            "Input:fixed",
            "Audio:fixed",
            "Input:update",
            "Audio:update",
            "Input:late",
            "Audio:late",
        ]
    );

    framework.shutdown();
    framework.shutdown();
    assert_eq!(drain(&journal), vec!["Audio:stop", "Input:stop"]);
}

#[test]
fn test_drop_shuts_down_running_framework() {
    let journal = Journal::default();
    {
        let mut framework = Framework::builder()
            .module(1, Physics::new(&journal))
            .build();
        framework.init_modules().unwrap();
        drain(&journal);
    }
    assert_eq!(drain(&journal), vec!["Physics:stop"]);
}

#[test]
fn test_skipped_and_unresolved_slots() {
    let journal = Journal::default();
    let framework = Framework::builder()
        .declare(ModuleSlot::module::<Audio>(1))
        .declare(ModuleSlot::unprioritized::<Input>())
        .declare(ModuleSlot::other::<String>(Some(0)))
        .component(Input::new(&journal))
        .module(4, Ui::new(&journal))
        .build();

    // Audio is declared but never attached; Input is attached but unprioritized.
    assert_eq!(framework.module_names(), vec!["MessageModule", "Ui"]);
    assert!(framework.module::<Input>().is_some());
    assert!(framework.module::<Audio>().is_none());
}

#[test]
fn test_failing_init_stops_startup() {
    let journal = Journal::default();
    let mut framework = Framework::builder()
        .module(1, Audio::new(&journal))
        .module(2, Broken)
        .module(3, Ui::new(&journal))
        .build();

    let err = framework.init_modules().unwrap_err();
    assert!(format!("{err:#}").contains("device unavailable"));
    assert_eq!(drain(&journal), vec!["Audio:init"]);
    assert!(framework.start_modules().is_err());
}

#[test]
fn test_typed_module_access() {
    let journal = Journal::default();
    let framework = Framework::builder()
        .module(1, Audio::new(&journal))
        .build();

    let audio = framework.module::<Audio>().unwrap();
    audio.lock().unwrap().log("ping");
    assert_eq!(drain(&journal), vec!["Audio:ping"]);

    let message = framework.module::<MessageModule>().unwrap();
    assert!(Arc::ptr_eq(message.lock().unwrap().bus(), framework.message()));
}

#[tokio::test]
async fn test_module_waits_on_monitor() {
    #[derive(Clone, Debug, PartialEq)]
    struct AssetsReady(u32);

    #[derive(Default)]
    struct Loader {
        monitor: Option<Arc<Monitor>>,
        handle: Option<WaitHandle<AssetsReady>>,
    }

    impl GameModule for Loader {
        fn on_start(&mut self) -> anyhow::Result<()> {
            let monitor = self
                .monitor
                .as_ref()
                .ok_or_else(|| anyhow::anyhow!("loader has no monitor"))?;
            self.handle = Some(monitor.wait::<AssetsReady>());
            Ok(())
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    let mut framework = Framework::builder().module(1, Loader::default()).build();
    let loader = framework.module::<Loader>().unwrap();
    loader.lock().unwrap().monitor = Some(Arc::clone(framework.monitor()));

    framework.init_modules().unwrap();
    framework.start_modules().unwrap();

    let handle = loader.lock().unwrap().handle.take().unwrap();
    assert!(framework.monitor().pending::<AssetsReady>());

    let resolver = Arc::clone(framework.monitor());
    tokio::spawn(async move {
        tokio::task::yield_now().await;
        resolver.set_result(AssetsReady(12));
    });

    assert_eq!(handle.await, Ok(AssetsReady(12)));
    assert_eq!(framework.monitor().pending_count(), 0);
}
