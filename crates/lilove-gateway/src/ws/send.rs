use tokio::sync::mpsc;

/// Serialize any value to JSON and queue it on the connection's outbound
/// channel. The writer task on the other end owns the socket sink.
///
/// An error means the writer task is gone and the connection is dead.
pub async fn json<T: serde::Serialize>(
    tx: &mpsc::Sender<String>,
    payload: &T,
) -> Result<(), mpsc::error::SendError<String>> {
    let json = serde_json::to_string(payload).unwrap_or_default();
    tx.send(json).await
}
