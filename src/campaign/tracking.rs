use chrono::Utc;
use tracing::debug;

use crate::outreach::Outreach;

/// 1x1 transparent GIF served for open tracking.
pub const TRACKING_PIXEL: [u8; 42] = [
    0x47, 0x49, 0x46, 0x38, 0x39, 0x61, 0x01, 0x00, 0x01, 0x00, 0x80, 0x00, 0x00, 0x00, 0x00, 0x00,
    0xff, 0xff, 0xff, 0x21, 0xf9, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00, 0x2c, 0x00, 0x00, 0x00, 0x00,
    0x01, 0x00, 0x01, 0x00, 0x00, 0x02, 0x01, 0x44, 0x00, 0x3b,
];

pub const TRACKING_PIXEL_CONTENT_TYPE: &str = "image/gif";

impl Outreach {
    /// Record the first open of a draft and return the pixel to serve.
    ///
    /// Mail clients must always get an image back, so lookup and storage errors are only
    /// logged.
    pub async fn record_open(&self, draft_id: Option<&str>) -> &'static [u8] {
        if let Some(draft_id) = draft_id {
            match self.store.mark_opened(draft_id, Utc::now()).await {
                Ok(true) => debug!(%draft_id, "draft_opened"),
                Ok(false) => {}
                Err(err) => debug!(%draft_id, error = %err, "open not recorded"),
            }
        }
        &TRACKING_PIXEL
    }
}
