use std::rc::Rc;

use layers::{Cursor, LayerGroup, LayerId, MapEngine, SourceId};
use runtime::{Frame, FrameSummary, Job, PhaseScheduler};

use crate::bridge::PointerBridge;
use crate::click::{ClickSubscription, ProjectClick, ProjectClickOptions};
use crate::cluster::ClusterZoom;
use crate::compose::InspectPopup;
use crate::config::KeyAliasConfig;
use crate::error::InspectError;
use crate::highlight::HoverHighlight;
use crate::pointer::PointerAffordance;
use crate::popup::{PopupOptions, PopupPresenter, PopupWidget};

/// Per-map entry point: owns the state shared by every popup, click handler
/// and highlight mounted on one map.
pub struct Inspector {
    engine: Rc<dyn MapEngine>,
    affordance: Rc<PointerAffordance>,
    scheduler: Rc<PhaseScheduler>,
    aliases: Rc<KeyAliasConfig>,
}

impl Inspector {
    pub fn new(engine: Rc<dyn MapEngine>, aliases: KeyAliasConfig) -> Self {
        Self {
            affordance: Rc::new(PointerAffordance::new(engine.clone())),
            engine,
            scheduler: Rc::new(PhaseScheduler::new()),
            aliases: Rc::new(aliases),
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.affordance.cursor()
    }

    pub fn bridge(&self) -> PointerBridge {
        PointerBridge::new(self.engine.clone(), self.affordance.clone())
    }

    pub fn presenter<W: PopupWidget + 'static>(
        &self,
        widget: W,
        options: PopupOptions,
    ) -> PopupPresenter<W> {
        PopupPresenter::new(widget, options, self.scheduler.clone())
    }

    pub fn feature_popup<W: PopupWidget + 'static>(
        &self,
        group: LayerGroup,
        widget: W,
        options: PopupOptions,
    ) -> Result<InspectPopup<W>, InspectError> {
        InspectPopup::features(
            &self.bridge(),
            group,
            self.aliases.clone(),
            self.presenter(widget, options),
        )
    }

    pub fn cluster_popup<W: PopupWidget + 'static>(
        &self,
        group: LayerGroup,
        widget: W,
        options: PopupOptions,
    ) -> Result<InspectPopup<W>, InspectError> {
        InspectPopup::clusters(&self.bridge(), group, self.presenter(widget, options))
    }

    pub fn cluster_zoom(&self, group: LayerGroup) -> Result<ClickSubscription, InspectError> {
        ClusterZoom::new(self.engine.clone(), group).subscribe_clicks()
    }

    pub fn highlight(
        &self,
        source: SourceId,
        layer: LayerId,
    ) -> Result<HoverHighlight, InspectError> {
        HoverHighlight::subscribe(self.engine.clone(), source, layer)
    }

    pub fn project_click(
        &self,
        group: LayerGroup,
        options: ProjectClickOptions,
    ) -> Result<ProjectClick, InspectError> {
        ProjectClick::subscribe(&self.bridge(), group, options)
    }

    /// Queues `run` for the paint phase of the next frame, after every
    /// pending popup layout job.
    pub fn on_paint(&self, id: &'static str, run: impl FnOnce(Frame) + 'static) {
        self.scheduler.schedule(Job::paint(id, run));
    }

    /// Runs the deferred work of one host frame.
    pub fn run_frame(&self, frame: Frame) -> FrameSummary {
        self.scheduler.run_frame(frame)
    }
}
