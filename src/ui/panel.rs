// src/ui/panel.rs
//! Scene control panel
//!
//! The dropdown selections of the host UI (goal height, ball scale, spin
//! speed), the replacement-model path field, and the corner text overlay
//! queued by the world's draw sequence.

use crate::gfx::renderer::OverlayLine;
use crate::world::{BALL_SCALES, BALL_SPIN_SPEEDS, GOAL_HEIGHTS};

/// Panel state; selection indices are read back by the host every frame.
pub struct ControlPanel {
    pub goal_height_index: usize,
    pub ball_scale_index: usize,
    pub spin_speed_index: usize,
    goal_height_labels: Vec<String>,
    ball_scale_labels: Vec<String>,
    spin_speed_labels: Vec<String>,
    model_path: String,
    pending_model: Option<String>,
    status: Option<String>,
}

impl ControlPanel {
    pub fn new(initial_model: impl Into<String>) -> Self {
        Self {
            goal_height_index: 0,
            ball_scale_index: 0,
            spin_speed_index: 0,
            goal_height_labels: GOAL_HEIGHTS.iter().map(|v| v.to_string()).collect(),
            ball_scale_labels: BALL_SCALES.iter().map(|v| v.to_string()).collect(),
            spin_speed_labels: BALL_SPIN_SPEEDS.iter().map(|v| v.to_string()).collect(),
            model_path: initial_model.into(),
            pending_model: None,
            status: None,
        }
    }

    /// A model path the user asked to load, if any.
    pub fn take_model_request(&mut self) -> Option<String> {
        self.pending_model.take()
    }

    pub fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    /// Builds the panel window and paints the overlay text.
    ///
    /// `interactive` is false while the scoring animation has input
    /// disabled; the controls render greyed out and inert.
    pub fn draw(&mut self, ui: &imgui::Ui, overlay: &[OverlayLine], interactive: bool) {
        ui.window("Match controls")
            .size([280.0, 220.0], imgui::Condition::FirstUseEver)
            .position([20.0, 20.0], imgui::Condition::FirstUseEver)
            .build(|| {
                {
                    let _greyed_out = ui.begin_disabled(!interactive);
                    ui.combo_simple_string(
                        "Goal height",
                        &mut self.goal_height_index,
                        &self.goal_height_labels,
                    );
                    ui.combo_simple_string(
                        "Ball scale",
                        &mut self.ball_scale_index,
                        &self.ball_scale_labels,
                    );
                    ui.combo_simple_string(
                        "Spin speed",
                        &mut self.spin_speed_index,
                        &self.spin_speed_labels,
                    );

                    ui.separator();
                    ui.input_text("Model", &mut self.model_path).build();
                    if ui.button("Load model") {
                        self.pending_model = Some(self.model_path.clone());
                    }
                }

                if let Some(status) = &self.status {
                    ui.separator();
                    ui.text_wrapped(status);
                }
            });

        let draw_list = ui.get_foreground_draw_list();
        for line in overlay {
            draw_list.add_text(
                [line.x, line.y],
                [line.color[0], line.color[1], line.color[2], 1.0],
                &line.text,
            );
        }
    }
}
