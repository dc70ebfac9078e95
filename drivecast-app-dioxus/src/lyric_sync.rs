//! Lyric highlighting driven by the `<audio>` element's position.

use crate::state::PreviewState;
use async_trait::async_trait;
use dioxus::prelude::*;
use drivecast_core::time::position_from_secs;
use drivecast_core::{LyricSync, PositionProbe};
use std::cell::RefCell;
use std::rc::Rc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::debug;

const LOG_TARGET: &str = "drivecast::lyric_sync";

/// DOM id of the audio element the probe reads from
pub const AUDIO_ELEMENT_ID: &str = "player-audio";

/// DOM id of lyric line `index`
#[must_use]
pub fn lyric_line_id(index: usize) -> String {
    format!("lyric-line-{index}")
}

/// Reads `currentTime` of a media element through the webview
pub struct MediaElementProbe {
    script: String,
}

impl MediaElementProbe {
    #[must_use]
    pub fn new(element_id: &str) -> Self {
        Self {
            script: format!(
                "const el = document.getElementById('{element_id}'); \
                 return el ? el.currentTime : null;"
            ),
        }
    }
}

#[async_trait(?Send)]
impl PositionProbe for MediaElementProbe {
    async fn position(&self) -> Option<Duration> {
        match document::eval(&self.script).await {
            Ok(value) => value.as_f64().and_then(position_from_secs),
            Err(e) => {
                debug!(target: LOG_TARGET, "Failed to read playback position: {}", e);
                None
            }
        }
    }
}

/// Scroll lyric line `index` to the vertical center of its panel
fn scroll_line_into_view(index: usize) {
    let js = format!(
        "document.getElementById('{}')?.scrollIntoView({{ block: 'center', behavior: 'smooth' }});",
        lyric_line_id(index)
    );
    let _ = document::eval(&js);
}

/// Hook that keeps `preview.active_line` in step with playback.
///
/// Each new lyric sequence starts a fresh poll loop; the previous loop is
/// cancelled first. Loops are children of the app's root token.
pub fn use_lyric_sync(preview: PreviewState, interval: Duration) {
    let root: CancellationToken = use_context();
    let running: Rc<RefCell<Option<CancellationToken>>> = use_hook(|| Rc::new(RefCell::new(None)));

    let on_drop = Rc::clone(&running);
    use_drop(move || {
        if let Some(token) = on_drop.borrow_mut().take() {
            token.cancel();
        }
    });

    use_effect(move || {
        let lines = preview.lyrics.read().lines().cloned();

        if let Some(previous) = running.borrow_mut().take() {
            previous.cancel();
        }

        let Some(lines) = lines else {
            return;
        };

        let token = root.child_token();
        *running.borrow_mut() = Some(token.clone());

        let mut active_line = preview.active_line;
        spawn(async move {
            let probe = MediaElementProbe::new(AUDIO_ELEMENT_ID);
            LyricSync::new(lines)
                .run(&probe, interval, token, move |focus| {
                    active_line.set(focus.index);
                    if let (true, Some(index)) = (focus.scroll, focus.index) {
                        scroll_line_into_view(index);
                    }
                })
                .await;
        });
    });
}
