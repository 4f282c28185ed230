//! Variant enumeration as an explicit state machine.
//!
//! For every combination the walker yields: a click and a label read for
//! each feature in order, one settle pause, then one extraction carrying the
//! variant name built from the labels read.

use crate::models::{variant_name, Combinations, VariantFeature};

/// Next action the page driver must perform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalkStep {
    Click { feature: usize, option: usize },
    /// Read the chosen option's label and hand it to [`VariantWalker::record_label`].
    ReadLabel { feature: usize, option: usize },
    Settle,
    Extract { variant_name: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    SelectCombination,
    Click,
    ReadLabel,
    NextFeature,
    Settle,
    Extract,
    Done,
}

#[derive(Debug, Clone)]
pub struct VariantWalker {
    features: Vec<VariantFeature>,
    combinations: Combinations,
    total: usize,
    current: Vec<usize>,
    position: usize,
    labels: Vec<String>,
    phase: Phase,
}

impl VariantWalker {
    pub fn new(features: Vec<VariantFeature>) -> Self {
        let combinations = Combinations::for_features(&features);
        let total = if combinations.clone().next().is_some() {
            combinations.total()
        } else {
            0
        };
        Self {
            features,
            combinations,
            total,
            current: Vec::new(),
            position: 0,
            labels: Vec::new(),
            phase: Phase::SelectCombination,
        }
    }

    /// Number of combinations this walk will extract.
    pub fn total(&self) -> usize {
        self.total
    }

    pub fn record_label(&mut self, label: impl Into<String>) {
        if self.labels.len() <= self.position {
            self.labels.push(label.into());
        }
    }

    pub fn next_step(&mut self) -> Option<WalkStep> {
        loop {
            match self.phase {
                Phase::SelectCombination => match self.combinations.next() {
                    Some(combination) => {
                        self.current = combination;
                        self.position = 0;
                        self.labels.clear();
                        self.phase = Phase::Click;
                    }
                    None => self.phase = Phase::Done,
                },
                Phase::Click => {
                    self.phase = Phase::ReadLabel;
                    return Some(WalkStep::Click {
                        feature: self.position,
                        option: self.current[self.position],
                    });
                }
                Phase::ReadLabel => {
                    self.phase = Phase::NextFeature;
                    return Some(WalkStep::ReadLabel {
                        feature: self.position,
                        option: self.current[self.position],
                    });
                }
                Phase::NextFeature => {
                    // A label that was never recorded reads as blank.
                    self.record_label(String::new());
                    self.position += 1;
                    self.phase = if self.position < self.current.len() {
                        Phase::Click
                    } else {
                        Phase::Settle
                    };
                }
                Phase::Settle => {
                    self.phase = Phase::Extract;
                    return Some(WalkStep::Settle);
                }
                Phase::Extract => {
                    self.phase = Phase::SelectCombination;
                    let name = variant_name(
                        self.features
                            .iter()
                            .zip(&self.labels)
                            .map(|(feature, label)| (feature.name.as_deref(), label.as_str())),
                    );
                    return Some(WalkStep::Extract { variant_name: name });
                }
                Phase::Done => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(name: Option<&str>, option_count: usize) -> VariantFeature {
        VariantFeature {
            name: name.map(str::to_string),
            option_count,
        }
    }

    /// Drive the walker, answering label reads from `labels[feature][option]`.
    fn run(walker: &mut VariantWalker, labels: &[&[&str]]) -> Vec<WalkStep> {
        let mut steps = Vec::new();
        while let Some(step) = walker.next_step() {
            if let WalkStep::ReadLabel { feature, option } = step {
                walker.record_label(labels[feature][option]);
            }
            steps.push(step);
        }
        steps
    }

    #[test]
    fn single_feature_walk() {
        let mut walker = VariantWalker::new(vec![feature(Some("Màu"), 2)]);
        assert_eq!(walker.total(), 2);

        let steps = run(&mut walker, &[&["Trắng", "Vàng"]]);
        assert_eq!(
            steps,
            vec![
                WalkStep::Click { feature: 0, option: 0 },
                WalkStep::ReadLabel { feature: 0, option: 0 },
                WalkStep::Settle,
                WalkStep::Extract {
                    variant_name: "Màu: Trắng".to_string()
                },
                WalkStep::Click { feature: 0, option: 1 },
                WalkStep::ReadLabel { feature: 0, option: 1 },
                WalkStep::Settle,
                WalkStep::Extract {
                    variant_name: "Màu: Vàng".to_string()
                },
            ]
        );
    }

    #[test]
    fn clicks_every_feature_per_combination_last_fastest() {
        let mut walker = VariantWalker::new(vec![feature(Some("Size"), 2), feature(None, 2)]);
        let steps = run(&mut walker, &[&["S", "L"], &[" red ", "blue"]]);

        let names: Vec<&str> = steps
            .iter()
            .filter_map(|s| match s {
                WalkStep::Extract { variant_name } => Some(variant_name.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(names, vec!["Size: S | red", "Size: S | blue", "Size: L | red", "Size: L | blue"]);

        let clicks = steps
            .iter()
            .filter(|s| matches!(s, WalkStep::Click { .. }))
            .count();
        assert_eq!(clicks, 8);
    }

    #[test]
    fn each_click_precedes_its_label_read() {
        let mut walker = VariantWalker::new(vec![feature(Some("A"), 1), feature(Some("B"), 1)]);
        let steps = run(&mut walker, &[&["a"], &["b"]]);
        assert_eq!(
            steps[..4],
            [
                WalkStep::Click { feature: 0, option: 0 },
                WalkStep::ReadLabel { feature: 0, option: 0 },
                WalkStep::Click { feature: 1, option: 0 },
                WalkStep::ReadLabel { feature: 1, option: 0 },
            ]
        );
    }

    #[test]
    fn feature_without_options_yields_nothing() {
        let mut walker = VariantWalker::new(vec![feature(Some("A"), 2), feature(Some("B"), 0)]);
        assert_eq!(walker.total(), 0);
        assert_eq!(walker.next_step(), None);
    }

    #[test]
    fn no_features_yields_nothing() {
        let mut walker = VariantWalker::new(Vec::new());
        assert_eq!(walker.total(), 0);
        assert_eq!(walker.next_step(), None);
    }

    #[test]
    fn unrecorded_label_reads_blank() {
        let mut walker = VariantWalker::new(vec![feature(Some("A"), 1), feature(None, 1)]);
        let mut names = Vec::new();
        while let Some(step) = walker.next_step() {
            if let WalkStep::ReadLabel { feature: 1, .. } = step {
                walker.record_label("x");
            }
            if let WalkStep::Extract { variant_name } = step {
                names.push(variant_name);
            }
        }
        assert_eq!(names, vec!["A:  | x"]);
    }
}
