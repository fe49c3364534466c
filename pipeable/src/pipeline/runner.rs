//! Sequential pipeline execution.

use super::{PipelineDefinition, RunOutcome, RunReport, StageRecord};
use crate::config::SettingsNode;
use crate::context::ExecutionContext;
use crate::core::StageDescriptor;
use crate::errors::PipeableError;
use crate::events::{self, EventSink, NoOpEventSink};
use crate::observability::SpanTimer;
use crate::registry::{LoadedStage, StageRegistry};
use chrono::Utc;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// An entry whose stage and parameters passed preflight.
struct PlannedStage {
    position: usize,
    host: String,
    loaded: LoadedStage,
    parameters: Map<String, Value>,
    stop_on_failed: bool,
}

/// Runs pipeline definitions against a registry.
///
/// Stages run strictly one after another and share a single
/// [`ExecutionContext`]. Parameters are merged as schema defaults, then the
/// `stages.<name>` settings node, then the entry's own overrides.
pub struct PipelineRunner {
    registry: Arc<StageRegistry>,
    event_sink: Arc<dyn EventSink>,
    settings: Option<SettingsNode>,
}

impl PipelineRunner {
    /// Creates a runner with no settings and a no-op event sink.
    #[must_use]
    pub fn new(registry: Arc<StageRegistry>) -> Self {
        Self {
            registry,
            event_sink: Arc::new(NoOpEventSink),
            settings: None,
        }
    }

    /// Sets the sink receiving lifecycle events.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = sink;
        self
    }

    /// Sets the resolved settings stages read their parameters from.
    #[must_use]
    pub fn with_settings(mut self, settings: SettingsNode) -> Self {
        self.settings = Some(settings);
        self
    }

    /// Returns the registry.
    #[must_use]
    pub fn registry(&self) -> &Arc<StageRegistry> {
        &self.registry
    }

    /// Checks that every entry resolves to a registered stage and that its
    /// merged parameters bind, without running anything.
    pub fn validate(&self, definition: &PipelineDefinition) -> Result<(), PipeableError> {
        self.preflight(definition).map(|_| ())
    }

    /// Runs `definition`, handing back the report and the final context.
    ///
    /// Configuration problems (unknown stage, bad parameters) are returned as
    /// errors before any stage executes. A stage that faults is recorded as
    /// failed and the run continues or halts according to its entry.
    pub async fn run(
        &self,
        definition: &PipelineDefinition,
        context: ExecutionContext,
    ) -> Result<RunOutcome, PipeableError> {
        let plan = self.preflight(definition)?;

        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let mut ctx = context;
        let mut records = Vec::with_capacity(plan.len());
        let mut halted_at = None;

        info!(%run_id, pipeline = %definition.name, stages = plan.len(), "Pipeline started");
        self.event_sink
            .emit(
                events::PIPELINE_STARTED,
                Some(json!({
                    "run_id": run_id.to_string(),
                    "pipeline": definition.name,
                    "stages": plan.len(),
                })),
            )
            .await;

        for planned in plan {
            let record = self.run_stage(run_id, &definition.name, &planned, &mut ctx).await?;
            let halt = record.failed && planned.stop_on_failed;
            records.push(record);

            if halt {
                warn!(%run_id, position = planned.position, "Pipeline halted by failed stage");
                halted_at = Some(planned.position);
                self.event_sink
                    .emit(
                        events::PIPELINE_HALTED,
                        Some(json!({
                            "run_id": run_id.to_string(),
                            "pipeline": definition.name,
                            "position": planned.position,
                        })),
                    )
                    .await;
                break;
            }
        }

        let succeeded = records.iter().all(|record| !record.failed);
        let report = RunReport {
            run_id,
            pipeline: definition.name.clone(),
            started_at,
            finished_at: Utc::now(),
            stages: records,
            succeeded,
            halted_at,
        };

        info!(
            %run_id,
            pipeline = %definition.name,
            succeeded,
            executed = report.stages.len(),
            duration_ms = report.duration_ms(),
            "Pipeline finished"
        );
        self.event_sink
            .emit(
                events::PIPELINE_COMPLETED,
                Some(json!({
                    "run_id": run_id.to_string(),
                    "pipeline": definition.name,
                    "succeeded": succeeded,
                    "executed": report.stages.len(),
                })),
            )
            .await;

        Ok(RunOutcome {
            report,
            context: ctx,
        })
    }

    async fn run_stage(
        &self,
        run_id: Uuid,
        pipeline: &str,
        planned: &PlannedStage,
        ctx: &mut ExecutionContext,
    ) -> Result<StageRecord, PipeableError> {
        let descriptor = planned.loaded.descriptor().clone();
        let mut instance = planned.loaded.instantiate();
        instance.configure(&planned.parameters)?;

        debug!(%run_id, stage = %descriptor.name, position = planned.position, "Stage started");
        self.event_sink
            .emit(
                events::STAGE_STARTED,
                Some(json!({
                    "run_id": run_id.to_string(),
                    "pipeline": pipeline,
                    "stage": descriptor.name,
                    "position": planned.position,
                })),
            )
            .await;

        let timer = SpanTimer::start(&descriptor.name);
        let faulted = match instance.execute(ctx).await {
            Ok(()) => false,
            Err(PipeableError::Fault(fault)) => {
                error!(
                    %run_id,
                    stage = %descriptor.name,
                    position = planned.position,
                    panicked = fault.panicked,
                    error = %fault.message,
                    "Stage faulted"
                );
                instance.record_fault(&fault);
                true
            }
            Err(other) => return Err(other),
        };
        let duration_ms = timer.finish();

        let failed = instance.failed();
        let event_type = if faulted {
            events::STAGE_FAULTED
        } else if failed {
            events::STAGE_FAILED
        } else {
            events::STAGE_COMPLETED
        };
        if failed && !faulted {
            warn!(%run_id, stage = %descriptor.name, position = planned.position, "Stage reported failure");
        }
        for message in instance.messages() {
            debug!(stage = %descriptor.name, message = %message, "Stage message");
        }

        let (_, messages) = instance.into_outcome().into_parts();
        self.event_sink
            .emit(
                event_type,
                Some(json!({
                    "run_id": run_id.to_string(),
                    "pipeline": pipeline,
                    "stage": descriptor.name,
                    "position": planned.position,
                    "duration_ms": duration_ms,
                    "messages": messages,
                })),
            )
            .await;

        Ok(StageRecord {
            position: planned.position,
            name: descriptor.name.clone(),
            host: planned.host.clone(),
            label: descriptor.label.clone(),
            category: descriptor.category,
            failed,
            faulted,
            messages,
            duration_ms,
        })
    }

    fn preflight(&self, definition: &PipelineDefinition) -> Result<Vec<PlannedStage>, PipeableError> {
        definition.validate()?;

        let mut plan = Vec::with_capacity(definition.stages.len());
        for (position, entry) in definition.stages.iter().enumerate() {
            let host = entry.resolved_host(&definition.host).to_string();
            let loaded = self.registry.load(&host, &entry.stage)?;

            let mut parameters = self.settings_parameters(loaded.descriptor(), &entry.stage);
            for (name, value) in &entry.parameters {
                parameters.insert(name.clone(), value.clone());
            }
            loaded.descriptor().bind(&parameters)?;

            plan.push(PlannedStage {
                position,
                host,
                loaded,
                parameters,
                stop_on_failed: entry.stop_on_failed,
            });
        }
        Ok(plan)
    }

    /// Values under `stages.<stage>` for parameters the stage declares.
    ///
    /// Settings are shared between pipelines, so keys a stage does not
    /// declare are skipped here instead of failing the bind.
    fn settings_parameters(
        &self,
        descriptor: &StageDescriptor,
        stage: &str,
    ) -> Map<String, Value> {
        self.settings
            .as_ref()
            .and_then(|settings| settings.child("stages"))
            .and_then(|stages| stages.child(stage))
            .map(|node| {
                node.to_parameters()
                    .into_iter()
                    .filter(|(name, _)| descriptor.parameter(name).is_some())
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl std::fmt::Debug for PipelineRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineRunner")
            .field("registry", &self.registry)
            .field("has_settings", &self.settings.is_some())
            .finish_non_exhaustive()
    }
}
