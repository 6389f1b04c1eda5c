//! Discrete host commands
//!
//! Keyboard shortcuts and overlay buttons both resolve to a [`Command`], so
//! the two surfaces stay in sync.

use winit::keyboard::KeyCode;

use crate::patterns::GeneratorKind;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    /// Clear the grid and seed it with a generator
    Generate(GeneratorKind),
    /// Reset every cell to dead
    Clear,
    /// Rebuild the kernel and buffers
    Restart,
    TogglePause,
    /// Single generation while paused
    Step,
    Quit,
}

impl Command {
    /// Default key bindings
    pub fn from_key(key: KeyCode) -> Option<Self> {
        let command = match key {
            KeyCode::Space => Command::Generate(GeneratorKind::RandomFill),
            KeyCode::Digit1 => Command::Generate(GeneratorKind::Sierpinski),
            KeyCode::Digit2 => Command::Generate(GeneratorKind::Mandelbrot),
            KeyCode::Digit3 => Command::Generate(GeneratorKind::Julia),
            KeyCode::Digit4 => Command::Generate(GeneratorKind::DragonCurve),
            KeyCode::Digit5 => Command::Generate(GeneratorKind::SierpinskiArrowhead),
            KeyCode::Digit6 => Command::Generate(GeneratorKind::KochSnowflake),
            KeyCode::Digit7 => Command::Generate(GeneratorKind::BarnsleyFern),
            KeyCode::Digit8 => Command::Generate(GeneratorKind::Showcase),
            KeyCode::KeyC => Command::Clear,
            KeyCode::KeyR => Command::Restart,
            KeyCode::KeyP => Command::TogglePause,
            KeyCode::KeyN => Command::Step,
            KeyCode::Escape => Command::Quit,
            _ => return None,
        };
        Some(command)
    }

    /// Key label shown next to overlay buttons
    pub fn shortcut(&self) -> &'static str {
        match self {
            Command::Generate(GeneratorKind::RandomFill) => "Space",
            Command::Generate(GeneratorKind::Sierpinski) => "1",
            Command::Generate(GeneratorKind::Mandelbrot) => "2",
            Command::Generate(GeneratorKind::Julia) => "3",
            Command::Generate(GeneratorKind::DragonCurve) => "4",
            Command::Generate(GeneratorKind::SierpinskiArrowhead) => "5",
            Command::Generate(GeneratorKind::KochSnowflake) => "6",
            Command::Generate(GeneratorKind::BarnsleyFern) => "7",
            Command::Generate(GeneratorKind::Showcase) => "8",
            Command::Clear => "C",
            Command::Restart => "R",
            Command::TogglePause => "P",
            Command::Step => "N",
            Command::Quit => "Esc",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_generator_has_a_key() {
        let keys = [
            KeyCode::Space,
            KeyCode::Digit1,
            KeyCode::Digit2,
            KeyCode::Digit3,
            KeyCode::Digit4,
            KeyCode::Digit5,
            KeyCode::Digit6,
            KeyCode::Digit7,
            KeyCode::Digit8,
        ];
        let bound: Vec<_> = keys.iter().filter_map(|k| Command::from_key(*k)).collect();
        for kind in GeneratorKind::ALL {
            assert!(bound.contains(&Command::Generate(kind)), "{kind:?} unbound");
        }
    }

    #[test]
    fn test_shortcut_labels_round_trip() {
        assert_eq!(Command::from_key(KeyCode::KeyN), Some(Command::Step));
        assert_eq!(Command::Step.shortcut(), "N");
        assert_eq!(Command::from_key(KeyCode::KeyZ), None);
    }
}
