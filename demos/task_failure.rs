use bounded_pool::{map, PoolError, TaskToExecute, Thunk};
use std::time::Duration;
use tracing::info;

fn step(id: usize, delay_ms: u64, fail: bool) -> Thunk<usize, String> {
  Box::new(move || -> TaskToExecute<usize, String> {
    Box::pin(async move {
      info!("Step {}: starting", id);
      tokio::time::sleep(Duration::from_millis(delay_ms)).await;
      if fail {
        info!("Step {}: failing", id);
        return Err(format!("step {} could not reach its upstream", id));
      }
      info!("Step {}: done", id);
      Ok::<usize, String>(id)
    })
  })
}

#[tokio::main]
async fn main() {
  tracing_subscriber::fmt()
    .with_max_level(tracing::Level::DEBUG)
    .with_target(false)
    .init();
  info!("--- Task Failure Example ---");

  // Step 2 fails while step 3 is still running; step 3 is drained, steps 4.. never start.
  let thunks = vec![
    step(0, 100, false),
    step(1, 100, false),
    step(2, 100, true),
    step(3, 300, false),
    step(4, 100, false),
    step(5, 100, false),
  ];

  match map(thunks, 2).await {
    Ok(results) => info!("UNEXPECTED success: {:?}", results),
    Err(PoolError::TasksFailed(failures)) => {
      info!("Map failed with {} failure(s):", failures.len());
      for failure in &failures {
        info!("  {}", failure);
      }
    }
    Err(e) => info!("Map failed: {}", e),
  }

  info!("--- Task Failure Example End ---");
}
