//! Ordered node failover.

use std::future::Future;
use tracing::warn;

use crate::endpoint::Node;
use crate::envelope::Fault;

/// Calls `call` for each node in order and returns the first success.
///
/// Failures on every node but the last are logged and swallowed; the last
/// node's fault is returned as is. There is no backoff and no memory of
/// failed nodes between calls.
///
/// # Errors
///
/// Returns the last node's fault when every node fails, or
/// [`Fault::Invocation`] when `nodes` is empty.
pub async fn first_success<'a, T, F, Fut>(nodes: &'a [Node], mut call: F) -> Result<T, Fault>
where
    F: FnMut(&'a Node) -> Fut,
    Fut: Future<Output = Result<T, Fault>>,
{
    let Some((last, rest)) = nodes.split_last() else {
        return Err(Fault::Invocation("endpoint has no nodes".to_string()));
    };
    for node in rest {
        match call(node).await {
            Ok(value) => return Ok(value),
            Err(fault) => warn!(node = %node, error = %fault, "Node failed, trying next"),
        }
    }
    call(last).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn nodes(n: u16) -> Vec<Node> {
        (1..=n).map(|p| Node::http("127.0.0.1", p).unwrap()).collect()
    }

    #[tokio::test]
    async fn returns_first_successful_node() {
        let nodes = nodes(3);
        let calls = AtomicUsize::new(0);
        let result = first_success(&nodes, |node| {
            calls.fetch_add(1, Ordering::SeqCst);
            let port = node.port();
            async move {
                if port < 3 {
                    Err(Fault::Invocation(format!("n{port} down")))
                } else {
                    Ok(port)
                }
            }
        })
        .await;
        assert_eq!(result.unwrap(), 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn propagates_the_last_nodes_fault() {
        let nodes = nodes(2);
        let result: Result<(), Fault> = first_success(&nodes, |node| {
            let port = node.port();
            async move { Err(Fault::Invocation(format!("n{port} down"))) }
        })
        .await;
        assert_eq!(result.unwrap_err().to_string(), "n2 down");
    }

    #[tokio::test]
    async fn stops_after_first_success() {
        let nodes = nodes(3);
        let calls = AtomicUsize::new(0);
        let result = first_success(&nodes, |_| {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, Fault>("ok") }
        })
        .await;
        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
