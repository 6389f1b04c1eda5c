use imgui::Ui;

use crate::{
    command::Command,
    patterns::GeneratorKind,
    simulation::{SimulationStepper, Status},
};

const ERROR_COLOR: [f32; 4] = [1.0, 0.35, 0.3, 1.0];
const MUTED_COLOR: [f32; 4] = [0.7, 0.7, 0.7, 1.0];

/// Status overlay. Returns the command of any button pressed this frame.
pub fn status_panel(ui: &Ui, stepper: &SimulationStepper, fps: f32) -> Option<Command> {
    let mut command = None;

    ui.window("Life")
        .size([300.0, 420.0], imgui::Condition::FirstUseEver)
        .position([10.0, 10.0], imgui::Condition::FirstUseEver)
        .bg_alpha(0.8)
        .build(|| {
            match stepper.status() {
                Status::Idle => {
                    ui.text("Loading...");
                    return;
                }
                Status::Failed(message) => {
                    ui.text_colored(ERROR_COLOR, "Simulation halted");
                    ui.text_wrapped(message);
                    ui.separator();
                    ui.text(format!("Press {} to restart", Command::Restart.shortcut()));
                    if ui.button("Restart") {
                        command = Some(Command::Restart);
                    }
                    return;
                }
                Status::Running => {}
            }

            let stats = stepper.stats();
            let grid = stepper.current();

            ui.text(format!("Generation: {}", stepper.generation()));
            ui.text(format!("Live cells: {}", grid.alive_count()));
            ui.text(format!("Grid: {}x{}", grid.width(), grid.height()));
            ui.text(format!("Frame rate: {fps:.0} fps"));
            ui.text(format!("Steps/sec (kernel bound): {:.0}", stats.frequency()));
            ui.text(format!(
                "Kernel: {} ({:.2} ms)",
                stepper.kernel_name().unwrap_or("-"),
                stats.average_step_time().as_secs_f64() * 1000.0
            ));
            ui.text_colored(MUTED_COLOR, format!("Seed: {}", stepper.seed()));

            if stepper.is_paused() {
                ui.text_colored(MUTED_COLOR, "Paused");
            }
            if let Some(name) = stepper.pending_generation() {
                ui.text_colored(MUTED_COLOR, format!("Generating {name}..."));
            }

            ui.separator();
            if ui.collapsing_header("Patterns", imgui::TreeNodeFlags::DEFAULT_OPEN) {
                for kind in GeneratorKind::ALL {
                    let generate = Command::Generate(kind);
                    if ui.button(format!("{} [{}]", kind.as_str(), generate.shortcut())) {
                        command = Some(generate);
                    }
                }
            }

            ui.separator();
            let controls = [
                ("Clear", Command::Clear),
                ("Restart", Command::Restart),
                (
                    if stepper.is_paused() { "Resume" } else { "Pause" },
                    Command::TogglePause,
                ),
                ("Step", Command::Step),
            ];
            for (i, (label, control)) in controls.into_iter().enumerate() {
                if i > 0 {
                    ui.same_line();
                }
                if ui.button(label) {
                    command = Some(control);
                }
            }

            ui.text_colored(
                MUTED_COLOR,
                "Click or drag to draw. P pauses, N steps once.",
            );
        });

    command
}
