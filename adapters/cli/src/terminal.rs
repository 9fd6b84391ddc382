//! Plain-text rendering backend.

use std::io::{self, Write};

use anyhow::{Context, Result};
use draft_wheel_rendering::{
    pointer_wheel_angle, Presentation, RenderingBackend, Scene, SegmentLabel,
};

const PROGRESS_WIDTH: usize = 30;

/// Writes wheel scenes to a text stream.
///
/// Scenes with a running spin redraw a single progress line in place;
/// settled scenes print the full wheel.
pub(crate) struct TerminalBackend<W> {
    out: W,
    spinning: bool,
}

impl TerminalBackend<io::Stdout> {
    pub(crate) fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> TerminalBackend<W> {
    pub(crate) fn new(out: W) -> Self {
        Self {
            out,
            spinning: false,
        }
    }

    fn draw_progress(&mut self, presentation: &Presentation, scene: &Scene, progress: f64) -> Result<()> {
        let filled = ((progress * PROGRESS_WIDTH as f64).round() as usize).min(PROGRESS_WIDTH);
        let under_pointer = scene
            .layout
            .segment_index_at(pointer_wheel_angle(
                scene.rotation,
                presentation.wheel.pointer_angle(),
            ))
            .and_then(|index| scene.layout.segments.get(index))
            .map_or("", |segment| segment.name.as_str());
        write!(
            self.out,
            "\r[{}{}] {:>3}%  {:<16}",
            "#".repeat(filled),
            " ".repeat(PROGRESS_WIDTH - filled),
            (progress * 100.0).round() as u32,
            under_pointer
        )?;
        self.out.flush()?;
        self.spinning = true;
        Ok(())
    }

    fn draw_wheel(&mut self, presentation: &Presentation, scene: &Scene) -> Result<()> {
        if self.spinning {
            writeln!(self.out)?;
            self.spinning = false;
        }

        writeln!(self.out, "{}", presentation.title)?;
        if let Some(winner) = &scene.winner {
            writeln!(self.out, "The winner is... {}!", winner.name)?;
        }

        let total: f64 = scene
            .layout
            .segments
            .iter()
            .map(|segment| segment.span.sweep())
            .sum();
        if !scene.layout.segments.is_empty() {
            writeln!(self.out, "Remaining contestants:")?;
        }
        for segment in &scene.layout.segments {
            let percent = if total > 0.0 {
                (100.0 * segment.span.sweep() / total).round() as u32
            } else {
                0
            };
            let marker = match segment.label {
                SegmentLabel::Text { .. } => ' ',
                SegmentLabel::Marker { .. } => '>',
            };
            writeln!(
                self.out,
                " {marker} {:<16} {:>3}% chance  {}",
                segment.name.as_str(),
                percent,
                segment.color
            )?;
        }
        if !scene.layout.overflow_names.is_empty() {
            let names: Vec<&str> = scene
                .layout
                .overflow_names
                .iter()
                .map(|name| name.as_str())
                .collect();
            writeln!(self.out, "Too narrow to label: {}", names.join(", "))?;
        }

        if scene.remaining_draws == 0 {
            writeln!(self.out, "Draft Complete!")?;
        } else {
            writeln!(self.out, "Spins remaining: {}", scene.remaining_draws)?;
        }
        self.out.flush()?;
        Ok(())
    }
}

impl<W: Write> RenderingBackend for TerminalBackend<W> {
    fn present(&mut self, presentation: &Presentation, scene: &Scene) -> Result<()> {
        match scene.spin_progress {
            Some(progress) if progress < 1.0 => self
                .draw_progress(presentation, scene, progress)
                .context("failed to draw spin progress"),
            _ => self
                .draw_wheel(presentation, scene)
                .context("failed to draw wheel"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use draft_wheel_core::{ContestantName, ContestantSnapshot, SegmentColor, Weight};
    use draft_wheel_rendering::{WheelLayout, WheelPresentation};

    fn snapshot(name: &str, weight: f64) -> ContestantSnapshot {
        let weight = Weight::new(weight).expect("positive weight");
        ContestantSnapshot {
            name: ContestantName::from(name),
            color: SegmentColor::from_rgb(0x10, 0x20, 0x30),
            weight,
            initial_weight: weight,
        }
    }

    fn render(scene: &Scene) -> String {
        let wheel = WheelPresentation::with_radius(100.0).expect("valid presentation");
        let presentation = Presentation::new("Draft", wheel);
        let mut backend = TerminalBackend::new(Vec::new());
        backend.present(&presentation, scene).expect("present succeeds");
        String::from_utf8(backend.out).expect("utf8 output")
    }

    #[test]
    fn settled_scene_lists_odds_and_remaining_spins() {
        let wheel = WheelPresentation::with_radius(100.0).expect("valid presentation");
        let scene = Scene {
            layout: WheelLayout::new(&wheel, &[snapshot("Alex", 3.0), snapshot("Dakota", 1.0)], 0.0),
            rotation: 0.0,
            spin_progress: None,
            winner: None,
            remaining_draws: 2,
        };

        let output = render(&scene);
        assert!(output.contains("Alex"));
        assert!(output.contains(" 75% chance"));
        assert!(output.contains(" 25% chance"));
        assert!(output.contains("Spins remaining: 2"));
    }

    #[test]
    fn finished_draft_is_announced() {
        let scene = Scene {
            layout: WheelLayout::default(),
            rotation: 0.0,
            spin_progress: Some(1.0),
            winner: None,
            remaining_draws: 0,
        };

        assert!(render(&scene).contains("Draft Complete!"));
    }
}
