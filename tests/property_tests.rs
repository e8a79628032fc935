//! Property-based tests for the tape, history and machine.
//!
//! These tests use proptest to verify properties hold across
//! many randomly generated inputs.

use proptest::prelude::*;
use std::collections::HashSet;
use tursi::{History, Machine, Rule, RingHistory, Step, Tape, TapeConfig, Undo};

/// The tape's content before any write: the pattern repeated through cell 0.
fn expected_fill(pattern: &[char], cell: i64) -> char {
    pattern[cell.rem_euclid(pattern.len() as i64) as usize]
}

prop_compose! {
    fn small_config()(
        left_len in 0usize..4,
        right_len in 1usize..4,
        growth_factor in 0.5f64..2.5,
    ) -> TapeConfig {
        TapeConfig { left_len, right_len, growth_factor }
    }
}

#[derive(Debug, Clone)]
enum Op {
    Push(u8),
    Pop,
    Resize(usize),
}

fn arbitrary_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => any::<u8>().prop_map(Op::Push),
        2 => Just(Op::Pop),
        1 => (1usize..8).prop_map(Op::Resize),
    ]
}

fn numbered_rule(n: u8) -> Rule {
    Rule::new(format!("s{n}"), 'a', 'b', i64::from(n), "next").unwrap()
}

proptest! {
    #[test]
    fn unwritten_cells_follow_the_pattern(
        pattern in "[a-z]{1,5}",
        config in small_config(),
        cells in prop::collection::vec(-300i64..300, 1..20),
        far in -500i64..500,
    ) {
        let symbols: Vec<char> = pattern.chars().collect();
        let mut tape = Tape::with_config(config, &pattern).unwrap();

        for &cell in &cells {
            prop_assert_eq!(tape.read(cell), expected_fill(&symbols, cell));
        }

        // Force an expansion and check again.
        let value = tape.read(far);
        tape.write(far, value);
        for &cell in &cells {
            prop_assert_eq!(tape.read(cell), expected_fill(&symbols, cell));
        }
    }

    #[test]
    fn bulk_read_matches_single_reads(
        pattern in "[0-9]{1,4}",
        config in small_config(),
        writes in prop::collection::vec((-100i64..100, "[a-z]{1,10}"), 0..5),
        start in -150i64..150,
        count in 0i64..120,
    ) {
        let mut tape = Tape::with_config(config, &pattern).unwrap();
        for (cell, word) in &writes {
            tape.write_str(*cell, word).unwrap();
        }

        let single: Vec<char> = (start..start + count).map(|cell| tape.read(cell)).collect();
        prop_assert_eq!(tape.read_range(start, count), single);
    }

    #[test]
    fn written_words_read_back(
        config in small_config(),
        start in -200i64..200,
        word in "[a-z]{1,40}",
    ) {
        let mut tape = Tape::with_config(config, "_").unwrap();
        tape.write_str(start, &word).unwrap();

        let read: String = tape.read_range(start, word.len() as i64).into_iter().collect();
        prop_assert_eq!(read, word);
    }

    #[test]
    fn right_aligned_write_matches_shifted_write(
        end in -100i64..100,
        word in "[a-z]{1,20}",
    ) {
        let mut towards = Tape::new("01").unwrap();
        let mut shifted = Tape::new("01").unwrap();
        towards.write_towards(end, &word).unwrap();
        shifted.write_str(end - word.len() as i64 + 1, &word).unwrap();

        prop_assert_eq!(
            towards.read_range(end - 30, 60),
            shifted.read_range(end - 30, 60)
        );
    }

    #[test]
    fn undo_reverts_step(
        pattern in "[a-c]{1,3}",
        start_pos in -5i64..5,
        wild_read in any::<bool>(),
        wild_write in any::<bool>(),
        write in "[x-z]",
        movement in -3i64..=3,
        next_state in prop::sample::select(vec!["A", "B"]),
    ) {
        let mut tape = Tape::new(&pattern).unwrap();
        tape.set_pos(start_pos);
        let actual = tape.read_head();

        let read = if wild_read { '*' } else { actual };
        let write = if wild_write { '*' } else { write.chars().next().unwrap() };
        let rule = Rule::new("A", read, write, movement, next_state).unwrap();
        let table = [(rule.trigger.clone(), rule)].into_iter().collect();

        let mut machine = Machine::new(
            tape,
            table,
            "A",
            HashSet::new(),
            HashSet::new(),
            Some('*'),
            RingHistory::new(4).unwrap(),
        );

        let is_continue = matches!(machine.step(), Step::Continue { .. });
        prop_assert!(is_continue);
        prop_assert_eq!(machine.history().last().map(|r| r.trigger.read), Some(actual));

        let is_reverted = matches!(machine.undo(), Undo::Reverted { .. });
        prop_assert!(is_reverted);
        prop_assert_eq!(machine.state(), "A");
        prop_assert_eq!(machine.tape().pos(), start_pos);
        prop_assert_eq!(machine.tape().read(start_pos), actual);
        prop_assert_eq!(machine.history().steps(), 0);
    }

    #[test]
    fn wildcard_resolution_is_idempotent(
        read in prop::sample::select(vec!['*', 'a', 'b']),
        write in prop::sample::select(vec!['*', 'a', 'b']),
        actual in prop::sample::select(vec!['a', 'b', 'c']),
    ) {
        let rule = Rule::new("A", read, write, 1, "B").unwrap();

        let once = rule.resolve_wildcard(Some('*'), actual).into_owned();
        let twice = once.resolve_wildcard(Some('*'), actual).into_owned();
        prop_assert_eq!(&once, &twice);

        if read != '*' && write != '*' {
            prop_assert_eq!(&once, &rule);
        }
    }

    #[test]
    fn ring_history_matches_model(
        capacity in 1usize..8,
        ops in prop::collection::vec(arbitrary_op(), 0..60),
    ) {
        let mut history = RingHistory::new(capacity).unwrap();
        // (step number, rule id) of every retained entry, oldest first.
        let mut model: Vec<(u64, u8)> = Vec::new();
        let mut steps = 0u64;
        let mut capacity = capacity;

        for op in ops {
            match op {
                Op::Push(n) => {
                    history.push(numbered_rule(n));
                    steps += 1;
                    model.push((steps, n));
                    if model.len() > capacity {
                        model.remove(0);
                    }
                }
                Op::Pop => {
                    let expected = model.pop().map(|(_, n)| numbered_rule(n));
                    if expected.is_some() {
                        steps -= 1;
                    }
                    prop_assert_eq!(history.pop(), expected);
                }
                Op::Resize(new_capacity) => {
                    history.set_capacity(new_capacity).unwrap();
                    capacity = new_capacity;
                    if model.len() > capacity {
                        model.drain(..model.len() - capacity);
                    }
                }
            }

            prop_assert_eq!(history.steps(), steps);
            prop_assert_eq!(history.len(), model.len());
            for (i, (step, n)) in model.iter().enumerate() {
                prop_assert_eq!(history.step_at(i), *step);
                prop_assert_eq!(history.get(i), Some(&numbered_rule(*n)));
            }
        }
    }
}
