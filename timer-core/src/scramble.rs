//! Random-move scrambles for a 3x3 cube.

use std::fmt;

use rand::Rng;

pub const SCRAMBLE_LENGTH: usize = 20;

// Bound on rejection draws per move. With six faces a collision is 1/6, so
// reaching the bound is astronomically rare; the fallback keeps latency fixed.
const MAX_FACE_DRAWS: usize = 16;

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Face {
    U,
    D,
    L,
    R,
    F,
    B,
}

impl Face {
    pub const ALL: [Face; 6] = [Face::U, Face::D, Face::L, Face::R, Face::F, Face::B];

    pub fn symbol(self) -> char {
        match self {
            Face::U => 'U',
            Face::D => 'D',
            Face::L => 'L',
            Face::R => 'R',
            Face::F => 'F',
            Face::B => 'B',
        }
    }
}

/// Move suffix: clockwise quarter turn, counter-clockwise quarter turn, or half turn.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Modifier {
    None,
    Prime,
    Double,
}

impl Modifier {
    pub const ALL: [Modifier; 3] = [Modifier::None, Modifier::Prime, Modifier::Double];

    pub fn symbol(self) -> &'static str {
        match self {
            Modifier::None => "",
            Modifier::Prime => "'",
            Modifier::Double => "2",
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct Move {
    pub face: Face,
    pub modifier: Modifier,
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.face.symbol(), self.modifier.symbol())
    }
}

/// An immutable move sequence. Displayed with moves separated by two spaces.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct Scramble {
    moves: Vec<Move>,
}

impl Scramble {
    pub fn moves(&self) -> &[Move] {
        &self.moves
    }

    pub fn len(&self) -> usize {
        self.moves.len()
    }

    pub fn is_empty(&self) -> bool {
        self.moves.is_empty()
    }
}

impl fmt::Display for Scramble {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, mv) in self.moves.iter().enumerate() {
            if i > 0 {
                f.write_str("  ")?;
            }
            write!(f, "{mv}")?;
        }
        Ok(())
    }
}

/// Generate a scramble in which no two consecutive moves turn the same face.
pub fn generate_scramble<R: Rng + ?Sized>(rng: &mut R) -> Scramble {
    let mut moves: Vec<Move> = Vec::with_capacity(SCRAMBLE_LENGTH);
    let mut last_face = None;

    for _ in 0..SCRAMBLE_LENGTH {
        let face = draw_face(rng, last_face);
        let modifier = Modifier::ALL[rng.gen_range(0..Modifier::ALL.len())];
        moves.push(Move { face, modifier });
        last_face = Some(face);
    }

    Scramble { moves }
}

fn draw_face<R: Rng + ?Sized>(rng: &mut R, previous: Option<Face>) -> Face {
    let Some(previous) = previous else {
        return Face::ALL[rng.gen_range(0..Face::ALL.len())];
    };

    for _ in 0..MAX_FACE_DRAWS {
        let face = Face::ALL[rng.gen_range(0..Face::ALL.len())];
        if face != previous {
            return face;
        }
    }

    // Uniform over the five remaining faces, same distribution as rejection
    let mut idx = rng.gen_range(0..Face::ALL.len() - 1);
    if Face::ALL[idx] == previous {
        idx = Face::ALL.len() - 1;
    }
    Face::ALL[idx]
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn test_scramble_length() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let scramble = generate_scramble(&mut rng);
        assert_eq!(scramble.len(), SCRAMBLE_LENGTH);
        assert!(!scramble.is_empty());
    }

    #[test]
    fn test_no_consecutive_faces() {
        let mut rng = ChaCha8Rng::seed_from_u64(42);
        for _ in 0..500 {
            let scramble = generate_scramble(&mut rng);
            for pair in scramble.moves().windows(2) {
                assert_ne!(pair[0].face, pair[1].face, "{scramble}");
            }
        }
    }

    #[test]
    fn test_same_seed_same_scramble() {
        let mut rng1 = ChaCha8Rng::seed_from_u64(1234);
        let mut rng2 = ChaCha8Rng::seed_from_u64(1234);
        assert_eq!(generate_scramble(&mut rng1), generate_scramble(&mut rng2));
    }

    #[test]
    fn test_consecutive_scrambles_differ() {
        let mut rng = ChaCha8Rng::seed_from_u64(99);
        let first = generate_scramble(&mut rng);
        let second = generate_scramble(&mut rng);
        assert_ne!(first, second);
    }

    #[test]
    fn test_display_format() {
        let scramble = Scramble {
            moves: vec![
                Move { face: Face::R, modifier: Modifier::None },
                Move { face: Face::U, modifier: Modifier::Prime },
                Move { face: Face::F, modifier: Modifier::Double },
            ],
        };
        assert_eq!(scramble.to_string(), "R  U'  F2");
    }

    #[test]
    fn test_display_token_count() {
        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let text = generate_scramble(&mut rng).to_string();
        assert_eq!(text.split("  ").count(), SCRAMBLE_LENGTH);
        assert!(!text.starts_with(' '));
        assert!(!text.ends_with(' '));
    }

    #[test]
    fn test_all_faces_and_modifiers_appear() {
        let mut rng = ChaCha8Rng::seed_from_u64(5);
        let mut faces = std::collections::HashSet::new();
        let mut modifiers = std::collections::HashSet::new();
        for _ in 0..50 {
            for mv in generate_scramble(&mut rng).moves() {
                faces.insert(mv.face);
                modifiers.insert(mv.modifier);
            }
        }
        assert_eq!(faces.len(), Face::ALL.len());
        assert_eq!(modifiers.len(), Modifier::ALL.len());
    }

    #[test]
    fn test_draw_face_never_repeats_previous() {
        let mut rng = ChaCha8Rng::seed_from_u64(11);
        for previous in Face::ALL {
            for _ in 0..200 {
                assert_ne!(draw_face(&mut rng, Some(previous)), previous);
            }
        }
    }

    /// Always returns zero, so every rejection draw collides with `U`.
    struct StuckRng;

    impl rand::RngCore for StuckRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            dest.fill(0);
            Ok(())
        }
    }

    #[test]
    fn test_draw_face_is_bounded_with_degenerate_source() {
        let mut rng = StuckRng;
        assert_eq!(draw_face(&mut rng, None), Face::U);
        assert_ne!(draw_face(&mut rng, Some(Face::U)), Face::U);
        let scramble = generate_scramble(&mut rng);
        for pair in scramble.moves().windows(2) {
            assert_ne!(pair[0].face, pair[1].face);
        }
    }
}
