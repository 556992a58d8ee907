//! Stage graph, dispatch planning and the CPU scheduler for the four LUTs.
//!
//! The stage dependencies form a small DAG:
//!
//! ```text
//! Transmittance ─▶ MultiScattering ─┬─▶ SkyView
//!        └──────────────────────────┴─▶ AerialPerspective
//! ```
//!
//! [`AtmospherePipeline`] is the only scheduler. It walks the graph in
//! dependency waves, runs the stages of a wave in parallel and publishes each
//! table only once it is complete.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use glam::UVec3;
use rayon::prelude::*;
use tracing::{debug, debug_span, info};

use crate::aerial_perspective::{AerialPerspectiveLut, generate_aerial_perspective_lut};
use crate::error::AtmosphereError;
use crate::lut::LutId;
use crate::multi_scattering::{MultiScatteringLut, generate_multi_scattering_lut};
use crate::params::{AtmosphereParams, ViewParams};
use crate::settings::LutSettings;
use crate::sky_view::{SkyViewLut, generate_sky_view_lut};
use crate::transmittance::{TransmittanceLut, generate_transmittance_lut};

/// When a stage has to be re-run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Cadence {
    /// Only after the atmosphere parameters or LUT settings change.
    OnAtmosphereChange,
    /// Every frame.
    EveryFrame,
}

/// One generator in the stage graph.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StageNode {
    pub output: LutId,
    pub inputs: &'static [LutId],
    pub cadence: Cadence,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PipelineGraph {
    nodes: Vec<StageNode>,
}

impl PipelineGraph {
    /// The four atmosphere stages.
    pub fn atmosphere() -> Self {
        Self::from_nodes(vec![
            StageNode {
                output: LutId::Transmittance,
                inputs: &[],
                cadence: Cadence::OnAtmosphereChange,
            },
            StageNode {
                output: LutId::MultiScattering,
                inputs: &[LutId::Transmittance],
                cadence: Cadence::OnAtmosphereChange,
            },
            StageNode {
                output: LutId::SkyView,
                inputs: &[LutId::Transmittance, LutId::MultiScattering],
                cadence: Cadence::EveryFrame,
            },
            StageNode {
                output: LutId::AerialPerspective,
                inputs: &[LutId::Transmittance, LutId::MultiScattering],
                cadence: Cadence::EveryFrame,
            },
        ])
    }

    pub fn from_nodes(nodes: Vec<StageNode>) -> Self {
        Self { nodes }
    }

    pub fn nodes(&self) -> &[StageNode] {
        &self.nodes
    }

    pub fn node(&self, lut: LutId) -> Option<&StageNode> {
        self.nodes.iter().find(|node| node.output == lut)
    }

    /// Stages grouped so that every stage only reads outputs of earlier
    /// groups. Stages within a group are independent.
    pub fn waves(&self) -> Result<Vec<Vec<LutId>>, AtmosphereError> {
        for node in &self.nodes {
            for &input in node.inputs {
                if self.node(input).is_none() {
                    return Err(AtmosphereError::MissingInput {
                        stage: node.output,
                        input,
                    });
                }
            }
        }

        let mut pending: BTreeMap<LutId, usize> = self
            .nodes
            .iter()
            .map(|node| (node.output, node.inputs.len()))
            .collect();
        let mut waves = Vec::new();

        while !pending.is_empty() {
            let ready: Vec<LutId> = pending
                .iter()
                .filter(|&(_, &remaining)| remaining == 0)
                .map(|(&lut, _)| lut)
                .collect();
            if ready.is_empty() {
                return Err(AtmosphereError::CyclicGraph);
            }

            for lut in &ready {
                pending.remove(lut);
            }
            for node in &self.nodes {
                if let Some(remaining) = pending.get_mut(&node.output) {
                    *remaining -= node.inputs.iter().filter(|input| ready.contains(input)).count();
                }
            }
            waves.push(ready);
        }

        Ok(waves)
    }

    /// Stages in an order that respects every dependency.
    pub fn topological_order(&self) -> Result<Vec<LutId>, AtmosphereError> {
        Ok(self.waves()?.into_iter().flatten().collect())
    }
}

/// Compute work-group size used for a table.
pub fn workgroup_size(lut: LutId) -> UVec3 {
    if lut.is_volume() {
        UVec3::new(4, 4, 4)
    } else {
        UVec3::new(8, 8, 1)
    }
}

/// Size of a table in texels, as a 3D grid.
pub fn lut_extent(lut: LutId, settings: &LutSettings) -> UVec3 {
    match lut {
        LutId::Transmittance => settings.transmittance_size.extend(1),
        LutId::MultiScattering => settings.multi_scattering_size.extend(1),
        LutId::SkyView => settings.sky_view_size.extend(1),
        LutId::AerialPerspective => settings.aerial_perspective_size,
    }
}

/// One compute dispatch a GPU host should issue.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Dispatch {
    pub lut: LutId,
    pub workgroup_size: UVec3,
    /// Work-group counts covering the whole table.
    pub workgroups: UVec3,
    pub cadence: Cadence,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchStep {
    Dispatch(Dispatch),
    /// All previous dispatches must finish writing before the next one reads.
    Barrier,
}

/// Ordered dispatches with barriers between dependent waves.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DispatchPlan {
    steps: Vec<DispatchStep>,
}

impl DispatchPlan {
    pub fn build(graph: &PipelineGraph, settings: &LutSettings) -> Result<Self, AtmosphereError> {
        settings.validate()?;
        let mut steps = Vec::new();
        for (index, wave) in graph.waves()?.into_iter().enumerate() {
            if index > 0 {
                steps.push(DispatchStep::Barrier);
            }
            for lut in wave {
                let cadence = graph
                    .node(lut)
                    .map_or(Cadence::EveryFrame, |node| node.cadence);
                let group = workgroup_size(lut);
                let extent = lut_extent(lut, settings);
                steps.push(DispatchStep::Dispatch(Dispatch {
                    lut,
                    workgroup_size: group,
                    workgroups: (extent + group - UVec3::ONE) / group,
                    cadence,
                }));
            }
        }
        Ok(Self { steps })
    }

    pub fn steps(&self) -> &[DispatchStep] {
        &self.steps
    }

    pub fn dispatches(&self) -> impl Iterator<Item = &Dispatch> {
        self.steps.iter().filter_map(|step| match step {
            DispatchStep::Dispatch(dispatch) => Some(dispatch),
            DispatchStep::Barrier => None,
        })
    }

    /// Steps for one frame. Static stages are skipped unless `static_dirty`.
    pub fn frame_steps(&self, static_dirty: bool) -> Vec<DispatchStep> {
        let mut steps: Vec<DispatchStep> = Vec::new();
        for step in &self.steps {
            match step {
                DispatchStep::Dispatch(dispatch) => {
                    if static_dirty || dispatch.cadence == Cadence::EveryFrame {
                        steps.push(*step);
                    }
                }
                DispatchStep::Barrier => {
                    if matches!(steps.last(), Some(DispatchStep::Dispatch(_))) {
                        steps.push(*step);
                    }
                }
            }
        }
        if steps.last() == Some(&DispatchStep::Barrier) {
            steps.pop();
        }
        steps
    }
}

/// Transmittance and multiple-scattering tables for one atmosphere.
#[derive(Clone, Debug)]
pub struct StaticLuts {
    pub transmittance: Arc<TransmittanceLut>,
    pub multi_scattering: Arc<MultiScatteringLut>,
}

/// Every table for one frame.
#[derive(Clone, Debug)]
pub struct FrameLuts {
    pub transmittance: Arc<TransmittanceLut>,
    pub multi_scattering: Arc<MultiScatteringLut>,
    pub sky_view: Arc<SkyViewLut>,
    pub aerial_perspective: Arc<AerialPerspectiveLut>,
}

/// A finished table, tagged by stage.
#[derive(Clone, Debug)]
enum GeneratedLut {
    Transmittance(Arc<TransmittanceLut>),
    MultiScattering(Arc<MultiScatteringLut>),
    SkyView(Arc<SkyViewLut>),
    AerialPerspective(Arc<AerialPerspectiveLut>),
}

/// Tables written so far during a run.
#[derive(Default)]
struct LutStore {
    transmittance: Option<Arc<TransmittanceLut>>,
    multi_scattering: Option<Arc<MultiScatteringLut>>,
    sky_view: Option<Arc<SkyViewLut>>,
    aerial_perspective: Option<Arc<AerialPerspectiveLut>>,
}

impl LutStore {
    fn insert(&mut self, lut: GeneratedLut) {
        match lut {
            GeneratedLut::Transmittance(lut) => self.transmittance = Some(lut),
            GeneratedLut::MultiScattering(lut) => self.multi_scattering = Some(lut),
            GeneratedLut::SkyView(lut) => self.sky_view = Some(lut),
            GeneratedLut::AerialPerspective(lut) => self.aerial_perspective = Some(lut),
        }
    }

    fn transmittance(&self, stage: LutId) -> Result<&Arc<TransmittanceLut>, AtmosphereError> {
        self.transmittance
            .as_ref()
            .ok_or(AtmosphereError::MissingInput {
                stage,
                input: LutId::Transmittance,
            })
    }

    fn multi_scattering(&self, stage: LutId) -> Result<&Arc<MultiScatteringLut>, AtmosphereError> {
        self.multi_scattering
            .as_ref()
            .ok_or(AtmosphereError::MissingInput {
                stage,
                input: LutId::MultiScattering,
            })
    }
}

/// Inputs shared by every stage of a run.
struct StageContext<'a> {
    params: &'a AtmosphereParams,
    view: Option<&'a ViewParams>,
    settings: &'a LutSettings,
}

fn run_stage(
    lut: LutId,
    context: &StageContext<'_>,
    store: &LutStore,
) -> Result<GeneratedLut, AtmosphereError> {
    let _span = debug_span!("lut_stage", lut = lut.name()).entered();
    let start = Instant::now();

    let view = || {
        context.view.ok_or_else(|| {
            AtmosphereError::InvalidView(format!("{lut} stage needs view parameters"))
        })
    };

    let generated = match lut {
        LutId::Transmittance => GeneratedLut::Transmittance(Arc::new(generate_transmittance_lut(
            context.params,
            context.settings,
        ))),
        LutId::MultiScattering => {
            GeneratedLut::MultiScattering(Arc::new(generate_multi_scattering_lut(
                context.params,
                context.settings,
                store.transmittance(lut)?,
            )))
        }
        LutId::SkyView => GeneratedLut::SkyView(Arc::new(generate_sky_view_lut(
            context.params,
            view()?,
            context.settings,
            store.transmittance(lut)?,
            store.multi_scattering(lut)?,
        ))),
        LutId::AerialPerspective => {
            GeneratedLut::AerialPerspective(Arc::new(generate_aerial_perspective_lut(
                context.params,
                view()?,
                context.settings,
                store.transmittance(lut)?,
                store.multi_scattering(lut)?,
            )))
        }
    };

    debug!(
        "{} LUT: {} texels in {:.2?}",
        lut,
        context.settings.texel_count(lut),
        start.elapsed()
    );
    Ok(generated)
}

/// Run the given waves, skipping stages whose cadence is not `cadence`.
fn run_waves(
    waves: &[Vec<LutId>],
    graph: &PipelineGraph,
    cadence: Cadence,
    context: &StageContext<'_>,
    store: &mut LutStore,
) -> Result<(), AtmosphereError> {
    for wave in waves {
        let stages: Vec<LutId> = wave
            .iter()
            .copied()
            .filter(|&lut| graph.node(lut).is_some_and(|node| node.cadence == cadence))
            .collect();
        if stages.is_empty() {
            continue;
        }

        let generated = {
            let store: &LutStore = store;
            stages
                .par_iter()
                .map(|&lut| run_stage(lut, context, store))
                .collect::<Result<Vec<_>, _>>()?
        };
        for lut in generated {
            store.insert(lut);
        }
    }
    Ok(())
}

struct CachedStatic {
    params: AtmosphereParams,
    luts: StaticLuts,
}

/// Schedules the generators and caches the static tables.
///
/// The transmittance and multiple-scattering tables are regenerated only when
/// the atmosphere parameters differ from the last run; the sky-view and
/// aerial-perspective tables are regenerated on every frame.
pub struct AtmospherePipeline {
    settings: LutSettings,
    graph: PipelineGraph,
    waves: Vec<Vec<LutId>>,
    plan: DispatchPlan,
    cached: Option<CachedStatic>,
}

impl AtmospherePipeline {
    pub fn new(settings: LutSettings) -> Result<Self, AtmosphereError> {
        let graph = PipelineGraph::atmosphere();
        let waves = graph.waves()?;
        let plan = DispatchPlan::build(&graph, &settings)?;
        Ok(Self {
            settings,
            graph,
            waves,
            plan,
            cached: None,
        })
    }

    pub fn settings(&self) -> &LutSettings {
        &self.settings
    }

    pub fn graph(&self) -> &PipelineGraph {
        &self.graph
    }

    pub fn plan(&self) -> &DispatchPlan {
        &self.plan
    }

    /// Replace the generator settings. Drops the cached static tables when the
    /// settings actually change.
    pub fn set_settings(&mut self, settings: LutSettings) -> Result<(), AtmosphereError> {
        if settings == self.settings {
            return Ok(());
        }
        self.plan = DispatchPlan::build(&self.graph, &settings)?;
        self.settings = settings;
        self.cached = None;
        Ok(())
    }

    /// Forget the cached static tables.
    pub fn invalidate(&mut self) {
        self.cached = None;
    }

    /// Whether the cached static tables were built for `params`.
    pub fn is_current(&self, params: &AtmosphereParams) -> bool {
        self.cached
            .as_ref()
            .is_some_and(|cached| &cached.params == params)
    }

    /// Transmittance and multiple-scattering tables for `params`, regenerated
    /// only when `params` differ from the cached snapshot.
    pub fn static_luts(&mut self, params: &AtmosphereParams) -> Result<StaticLuts, AtmosphereError> {
        params.validate()?;
        if let Some(cached) = &self.cached
            && &cached.params == params
        {
            return Ok(cached.luts.clone());
        }

        let start = Instant::now();
        let context = StageContext {
            params,
            view: None,
            settings: &self.settings,
        };
        let mut store = LutStore::default();
        run_waves(
            &self.waves,
            &self.graph,
            Cadence::OnAtmosphereChange,
            &context,
            &mut store,
        )?;

        let luts = StaticLuts {
            transmittance: store.transmittance(LutId::SkyView)?.clone(),
            multi_scattering: store.multi_scattering(LutId::SkyView)?.clone(),
        };
        info!(
            "Atmosphere static LUTs regenerated in {:.2?} (transmittance {}x{}, multi-scattering {}x{})",
            start.elapsed(),
            self.settings.transmittance_size.x,
            self.settings.transmittance_size.y,
            self.settings.multi_scattering_size.x,
            self.settings.multi_scattering_size.y,
        );

        self.cached = Some(CachedStatic {
            params: params.clone(),
            luts: luts.clone(),
        });
        Ok(luts)
    }

    /// Produce every table for one frame.
    pub fn run_frame(
        &mut self,
        params: &AtmosphereParams,
        view: &ViewParams,
    ) -> Result<FrameLuts, AtmosphereError> {
        view.validate()?;
        let static_luts = self.static_luts(params)?;

        let context = StageContext {
            params,
            view: Some(view),
            settings: &self.settings,
        };
        let mut store = LutStore {
            transmittance: Some(static_luts.transmittance.clone()),
            multi_scattering: Some(static_luts.multi_scattering.clone()),
            ..LutStore::default()
        };
        run_waves(
            &self.waves,
            &self.graph,
            Cadence::EveryFrame,
            &context,
            &mut store,
        )?;

        let missing = |input| AtmosphereError::MissingInput {
            stage: LutId::AerialPerspective,
            input,
        };
        Ok(FrameLuts {
            transmittance: static_luts.transmittance,
            multi_scattering: static_luts.multi_scattering,
            sky_view: store.sky_view.ok_or_else(|| missing(LutId::SkyView))?,
            aerial_perspective: store
                .aerial_perspective
                .ok_or_else(|| missing(LutId::AerialPerspective))?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_atmosphere_waves() {
        let waves = PipelineGraph::atmosphere().waves().unwrap();
        assert_eq!(
            waves,
            vec![
                vec![LutId::Transmittance],
                vec![LutId::MultiScattering],
                vec![LutId::SkyView, LutId::AerialPerspective],
            ]
        );
    }

    #[test]
    fn test_topological_order_respects_inputs() {
        let graph = PipelineGraph::atmosphere();
        let order = graph.topological_order().unwrap();
        for node in graph.nodes() {
            let position = order.iter().position(|&lut| lut == node.output).unwrap();
            for input in node.inputs {
                let input_position = order.iter().position(|lut| lut == input).unwrap();
                assert!(input_position < position, "{input} must run before {}", node.output);
            }
        }
    }

    #[test]
    fn test_cycle_detected() {
        let graph = PipelineGraph::from_nodes(vec![
            StageNode {
                output: LutId::Transmittance,
                inputs: &[LutId::MultiScattering],
                cadence: Cadence::OnAtmosphereChange,
            },
            StageNode {
                output: LutId::MultiScattering,
                inputs: &[LutId::Transmittance],
                cadence: Cadence::OnAtmosphereChange,
            },
        ]);
        assert_eq!(graph.waves(), Err(AtmosphereError::CyclicGraph));
    }

    #[test]
    fn test_missing_producer_detected() {
        let graph = PipelineGraph::from_nodes(vec![StageNode {
            output: LutId::SkyView,
            inputs: &[LutId::Transmittance],
            cadence: Cadence::EveryFrame,
        }]);
        assert_eq!(
            graph.topological_order(),
            Err(AtmosphereError::MissingInput {
                stage: LutId::SkyView,
                input: LutId::Transmittance
            })
        );
    }

    #[test]
    fn test_dispatch_plan_workgroups() {
        let plan = DispatchPlan::build(&PipelineGraph::atmosphere(), &LutSettings::default()).unwrap();
        let dispatches: Vec<_> = plan.dispatches().collect();
        assert_eq!(dispatches.len(), 4);
        assert_eq!(dispatches[0].lut, LutId::Transmittance);
        assert_eq!(dispatches[0].workgroups, UVec3::new(32, 8, 1));
        assert_eq!(dispatches[2].workgroups, UVec3::new(24, 14, 1));
        assert_eq!(dispatches[3].workgroup_size, UVec3::new(4, 4, 4));
        assert_eq!(dispatches[3].workgroups, UVec3::new(8, 8, 8));

        let barriers = plan
            .steps()
            .iter()
            .filter(|step| **step == DispatchStep::Barrier)
            .count();
        assert_eq!(barriers, 2);
    }

    #[test]
    fn test_frame_steps_skip_static_stages() {
        let plan = DispatchPlan::build(&PipelineGraph::atmosphere(), &LutSettings::default()).unwrap();
        let steps = plan.frame_steps(false);
        assert_eq!(steps.len(), 2);
        assert!(steps.iter().all(|step| matches!(
            step,
            DispatchStep::Dispatch(Dispatch {
                cadence: Cadence::EveryFrame,
                ..
            })
        )));
        assert_eq!(plan.frame_steps(true), plan.steps());
    }

    #[test]
    fn test_empty_settings_rejected() {
        let mut settings = LutSettings::low();
        settings.transmittance_size.x = 0;
        assert!(matches!(
            AtmospherePipeline::new(settings),
            Err(AtmosphereError::EmptyLut {
                lut: LutId::Transmittance
            })
        ));
    }

    #[test]
    fn test_static_luts_cached_until_params_change() {
        let mut pipeline = AtmospherePipeline::new(LutSettings::low()).unwrap();
        let mut params = AtmosphereParams::earth();

        let first = pipeline.static_luts(&params).unwrap();
        let again = pipeline.static_luts(&params).unwrap();
        assert!(Arc::ptr_eq(&first.transmittance, &again.transmittance));
        assert!(pipeline.is_current(&params));

        params.mie_g = 0.7;
        assert!(!pipeline.is_current(&params));
        let changed = pipeline.static_luts(&params).unwrap();
        assert!(!Arc::ptr_eq(&first.multi_scattering, &changed.multi_scattering));
    }

    #[test]
    fn test_invalid_params_rejected() {
        let mut pipeline = AtmospherePipeline::new(LutSettings::low()).unwrap();
        let mut params = AtmosphereParams::earth();
        params.thickness_km = -1.0;
        assert!(matches!(
            pipeline.run_frame(&params, &ViewParams::default()),
            Err(AtmosphereError::InvalidParams(_))
        ));
    }
}
