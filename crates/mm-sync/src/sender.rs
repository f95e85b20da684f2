use tracing::{debug, warn};

use mm_client::{ClientError, Homeserver};

use crate::session::Session;

/// Deliver one plain-text message to `room_id`.
///
/// At most once: a failed send is reported to the caller and not retried.
pub async fn send_message<H: Homeserver + ?Sized>(
    homeserver: &H,
    session: &Session,
    room_id: &str,
    text: &str,
) -> Result<String, ClientError> {
    let txn_id = session.next_txn_id();
    match homeserver.send_text(room_id, &txn_id, text).await {
        Ok(event_id) => {
            debug!(room_id, txn_id = %txn_id, event_id = %event_id, "Message sent");
            Ok(event_id)
        }
        Err(e) => {
            warn!(room_id, txn_id = %txn_id, "Message dropped: {}", e);
            Err(e)
        }
    }
}
