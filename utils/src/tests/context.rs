use std::time::Duration;

use tokio::time::Instant;

use crate::context::{CancelReason, Context};
use crate::prelude::FutureTimeout;

#[tokio::test]
async fn test_context_cancel() {
	let (ctx, handler) = Context::new();

	let handle = tokio::spawn(async move {
		assert_eq!(ctx.done().await, CancelReason::Cancel);
	});

	handler
		.cancel()
		.timeout(Duration::from_millis(300))
		.await
		.expect("task should be cancelled");
	handle
		.timeout(Duration::from_millis(300))
		.await
		.expect("task should be cancelled")
		.expect("panic in task");
}

#[tokio::test]
async fn test_context_deadline() {
	let (ctx, mut handler) = Context::with_deadline(Instant::now() + Duration::from_millis(100));

	let handle = tokio::spawn(async move {
		assert_eq!(ctx.done().await, CancelReason::Deadline);
	});

	handle
		.timeout(Duration::from_millis(300))
		.await
		.expect("deadline should fire")
		.expect("panic in task");
	handler
		.done()
		.timeout(Duration::from_millis(300))
		.await
		.expect("all contexts should be dropped");
}

#[tokio::test]
async fn test_context_is_done() {
	let (ctx, handler) = Context::new();
	let child = ctx.clone();

	assert!(!ctx.is_done());

	let handle = tokio::spawn(async move {
		child.done().await;
		assert!(child.is_done());
	});

	drop(ctx);
	handler
		.cancel()
		.timeout(Duration::from_millis(300))
		.await
		.expect("task should be cancelled");
	handle
		.timeout(Duration::from_millis(300))
		.await
		.expect("task should be cancelled")
		.expect("panic in task");
}

#[tokio::test]
async fn test_context_timeout_is_done() {
	let (ctx, _handler) = Context::with_timeout(Duration::from_millis(10));

	tokio::time::sleep(Duration::from_millis(20)).await;

	assert!(ctx.is_done());
}
