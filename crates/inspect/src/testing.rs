use foundation::geo::LngLat;

use crate::popup::{CloseHandler, PopupOptions, PopupStyle, PopupWidget};

/// In-memory popup widget that records what the presenter asked of it.
#[derive(Default)]
pub struct RecordingWidget {
    pub mounts: usize,
    pub removals: usize,
    pub style_applications: usize,
    pub position: Option<LngLat>,
    pub html: String,
    pub options: Option<PopupOptions>,
    pub max_width_css: Option<String>,
    on_close: Option<CloseHandler>,
    drops_mount_style: bool,
    closes_on_remove: bool,
}

impl RecordingWidget {
    /// Ignores the style handed to `mount` and forgets applied styles on its
    /// first paint.
    pub fn dropping_mount_style() -> Self {
        Self {
            drops_mount_style: true,
            ..Self::default()
        }
    }

    /// Fires its close event when removed programmatically.
    pub fn closing_on_remove() -> Self {
        Self {
            closes_on_remove: true,
            ..Self::default()
        }
    }

    pub fn first_paint(&mut self) {
        if self.drops_mount_style {
            self.max_width_css = None;
        }
    }

    pub fn close_handler(&self) -> CloseHandler {
        self.on_close.clone().expect("widget is mounted")
    }
}

impl PopupWidget for RecordingWidget {
    fn mount(&mut self, position: LngLat, options: &PopupOptions, on_close: CloseHandler) {
        self.mounts += 1;
        self.position = Some(position);
        self.options = Some(options.clone());
        if !self.drops_mount_style {
            self.max_width_css = Some(options.style.max_width_css());
        }
        self.on_close = Some(on_close);
    }

    fn set_position(&mut self, position: LngLat) {
        self.position = Some(position);
    }

    fn set_content(&mut self, html: &str) {
        self.html = html.to_string();
    }

    fn apply_style(&mut self, style: &PopupStyle) {
        self.style_applications += 1;
        self.max_width_css = Some(style.max_width_css());
    }

    fn remove(&mut self) {
        self.removals += 1;
        let on_close = self.on_close.take();
        if self.closes_on_remove
            && let Some(cb) = on_close
        {
            cb();
        }
    }
}
