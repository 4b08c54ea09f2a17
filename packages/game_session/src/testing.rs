use std::sync::Mutex;

use game_feed::{Element, RenderSurface};

/// Records every notification as a short string.
#[derive(Default)]
pub struct RecordingSurface {
    events: Mutex<Vec<String>>,
}

impl RecordingSurface {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl RenderSurface for RecordingSurface {
    fn append(&self, session: &str, element: &Element) {
        self.record(format!("{session}:append:{}", element.text()));
    }

    fn replace_tail(&self, session: &str, element: &Element) {
        self.record(format!("{session}:replace:{}", element.text()));
    }

    fn idle(&self, session: &str) {
        self.record(format!("{session}:idle"));
    }

    fn reattach_head(&self, session: &str) {
        self.record(format!("{session}:reattach"));
    }
}
