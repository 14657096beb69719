// stagecraft/examples/cook_pipeline.rs

use async_trait::async_trait;
use stagecraft::{
  predicate, ContextData, OutlineDiagram, Pipeline, RecordingExecutor, Stage, StageError, StageResult, Step,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

// 1. The context shared by every step of a run
#[derive(Debug, Default)]
struct Kitchen {
  eggs: u32,
  boiled_eggs: u32,
  toast_slices: u32,
  served: Vec<String>,
}

// 2. Steps can be plain types implementing `Step`...
struct BoilEggs {
  eggs: u32,
}

#[async_trait]
impl Step<Kitchen> for BoilEggs {
  fn name(&self) -> &str {
    "boil_eggs"
  }

  async fn run(&self, ctx: ContextData<Kitchen>) -> StageResult {
    info!("Boiling {} eggs", self.eggs);
    tokio::time::sleep(Duration::from_millis(100)).await; // Simulate time it takes to do this action
    let mut kitchen = ctx.write();
    if kitchen.eggs < self.eggs {
      return Err(StageError::msg(format!("only {} eggs left", kitchen.eggs)));
    }
    kitchen.eggs -= self.eggs;
    kitchen.boiled_eggs += self.eggs;
    Ok(())
  }
}

// ...or closures wrapped with `step_fn`.
fn toast(slices: u32) -> Stage<Kitchen> {
  Stage::step(stagecraft::step_fn("toast_bread", move |ctx: ContextData<Kitchen>| async move {
    tokio::time::sleep(Duration::from_millis(60)).await;
    ctx.write().toast_slices += slices;
    info!("Toasted {} slices", slices);
    StageResult::Ok(())
  }))
}

fn serve(what: &'static str) -> Stage<Kitchen> {
  Stage::step(stagecraft::step_fn(format!("serve_{}", what), move |ctx: ContextData<Kitchen>| async move {
    ctx.write().served.push(what.to_string());
    StageResult::Ok(())
  }))
}

#[tokio::main]
async fn main() -> Result<(), StageError> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .init();

  info!("--- Cook Pipeline Example ---");

  // 3. Compose the tree: eggs and toast in parallel, then serve whatever is ready.
  let breakfast = Stage::sequential([
    Stage::parallel([Stage::step(BoilEggs { eggs: 2 }), toast(2)]),
    Stage::conditional(
      predicate(|ctx: ContextData<Kitchen>| ctx.read().boiled_eggs > 0),
      Some(serve("eggs")),
      Some(serve("toast_only")),
    ),
  ])
  .with_before(|stage: Stage<Kitchen>, _ctx: ContextData<Kitchen>| async move {
    info!("Starting {}", stage.label());
    StageResult::Ok(())
  })
  .with_after(|_stage: Stage<Kitchen>, ctx: ContextData<Kitchen>, result: StageResult| async move {
    // Running out of eggs is not worth failing breakfast over.
    if let Err(e) = &result {
      info!("Breakfast had a problem ({}), serving toast anyway", e);
      ctx.write().served.push("toast_only".to_string());
      return Ok(());
    }
    result
  });

  // 4. Draw it
  let mut diagram = OutlineDiagram::new();
  breakfast.draw(&mut diagram);
  info!("Pipeline outline:\n{}", diagram.render());

  // 5. Run it twice with one recording executor
  let recorder = Arc::new(RecordingExecutor::new());
  let pipeline = Pipeline::new(breakfast, recorder.clone());

  let stocked = ContextData::new(Kitchen {
    eggs: 6,
    ..Default::default()
  });
  pipeline.run(stocked.clone()).await?;
  info!("Stocked kitchen served: {:?}", stocked.read().served);

  let empty = ContextData::new(Kitchen::default());
  pipeline.run(empty.clone()).await?;
  info!("Empty kitchen served: {:?}", empty.read().served);

  for record in recorder.records() {
    info!(
      "{:<16} {:>5}ms {}",
      record.name,
      record.elapsed.as_millis(),
      record.error.as_deref().unwrap_or("ok")
    );
  }

  assert_eq!(stocked.read().served, vec!["eggs"]);
  assert_eq!(empty.read().served, vec!["toast_only"]);
  Ok(())
}
