//! Styles and rules: which symbolizers draw which features at which scales.

use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::expression::{EvalContext, Expression};
use crate::raster::CompOp;
use crate::symbolizer::Symbolizer;

/// How many of the matching rules of a style are applied to a feature.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum FilterMode {
    /// Every matching rule.
    #[default]
    All,
    /// Only the first matching rule.
    First,
}

/// Named set of rules, referenced by layers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct Style {
    /// Rules in declaration order.
    pub rules: Vec<Rule>,
    /// Rule matching mode.
    pub filter_mode: FilterMode,
    /// Opacity of the whole style. Styles with opacity below 1 are rendered into a separate
    /// image that is then composited onto the map.
    pub opacity: f64,
    /// Operator used to composite the separate image of the style onto the map. Setting it
    /// renders the style into a separate image.
    #[cfg_attr(feature = "serde", serde(rename = "image-compositing-op"))]
    pub comp_op: Option<CompOp>,
}

impl Default for Style {
    fn default() -> Self {
        Self {
            rules: vec![],
            filter_mode: FilterMode::default(),
            opacity: 1.0,
            comp_op: None,
        }
    }
}

impl Style {
    /// Creates an empty style.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule.
    pub fn with_rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Sets the filter mode.
    pub fn with_filter_mode(mut self, filter_mode: FilterMode) -> Self {
        self.filter_mode = filter_mode;
        self
    }

    /// Sets the style opacity.
    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    /// Sets the compositing operator of the style image.
    pub fn with_comp_op(mut self, comp_op: CompOp) -> Self {
        self.comp_op = Some(comp_op);
        self
    }

    /// Whether the style must be rendered into a separate image.
    pub fn needs_offscreen(&self) -> bool {
        self.opacity < 1.0 || self.comp_op.is_some_and(|op| op != CompOp::SrcOver)
    }

    /// Rules that apply at the given scale denominator.
    pub fn rules_for_scale(&self, scale_denominator: f64) -> ScaleRules<'_> {
        let mut rules = ScaleRules {
            filter_mode: self.filter_mode,
            normal: vec![],
            else_rules: vec![],
            also_rules: vec![],
        };

        for rule in self
            .rules
            .iter()
            .filter(|r| r.is_active_at(scale_denominator))
        {
            if rule.else_filter {
                rules.else_rules.push(rule);
            } else if rule.also_filter {
                rules.also_rules.push(rule);
            } else {
                rules.normal.push(rule);
            }
        }

        rules
    }
}

/// Rules of a style active at a particular scale, grouped for matching.
#[derive(Debug, Clone)]
pub struct ScaleRules<'a> {
    filter_mode: FilterMode,
    normal: Vec<&'a Rule>,
    else_rules: Vec<&'a Rule>,
    also_rules: Vec<&'a Rule>,
}

impl<'a> ScaleRules<'a> {
    /// Returns true if no rule is active at this scale.
    pub fn is_empty(&self) -> bool {
        self.normal.is_empty() && self.else_rules.is_empty() && self.also_rules.is_empty()
    }

    /// All active rules in declaration-group order: normal, else, also.
    pub fn iter(&self) -> impl Iterator<Item = &'a Rule> + '_ {
        self.normal
            .iter()
            .chain(&self.else_rules)
            .chain(&self.also_rules)
            .copied()
    }

    /// Adds the attributes read by the filters and symbolizers of the rules to `out`.
    pub fn collect_attributes(&self, out: &mut BTreeSet<String>) {
        for rule in self.iter() {
            rule.collect_attributes(out);
        }
    }

    /// Largest buffer hint of the rules' symbolizers.
    pub fn buffer_hint(&self) -> f64 {
        self.iter()
            .flat_map(|rule| &rule.symbolizers)
            .map(Symbolizer::buffer_hint)
            .fold(0.0, f64::max)
    }

    /// Rules to apply to the feature.
    ///
    /// These are either the matching normal rules (only the first one with
    /// [`FilterMode::First`]), or all else-rules if no normal rule matches, followed by the
    /// matching also-rules.
    pub fn matching(&self, context: &EvalContext) -> Vec<&'a Rule> {
        let mut matched = vec![];
        for rule in &self.normal {
            if rule.matches(context) {
                matched.push(*rule);
                if self.filter_mode == FilterMode::First {
                    break;
                }
            }
        }

        if matched.is_empty() {
            matched.extend(self.else_rules.iter().copied());
        }

        matched.extend(self.also_rules.iter().copied().filter(|r| r.matches(context)));
        matched
    }
}

fn is_unbounded(value: &f64) -> bool {
    value.is_infinite()
}

fn unbounded() -> f64 {
    f64::INFINITY
}

/// Filter, scale range and symbolizers.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "kebab-case"))]
pub struct Rule {
    /// Optional name, used in diagnostics.
    pub name: Option<String>,
    /// Features for which the filter is not `true` are not matched. A rule without a filter
    /// matches every feature.
    pub filter: Option<Expression>,
    /// Smallest scale denominator at which the rule is active (inclusive).
    #[cfg_attr(feature = "serde", serde(rename = "min-scale-denominator"))]
    pub min_scale: f64,
    /// Scale denominator from which the rule is no longer active (exclusive).
    #[cfg_attr(
        feature = "serde",
        serde(
            rename = "max-scale-denominator",
            default = "unbounded",
            skip_serializing_if = "is_unbounded"
        )
    )]
    pub max_scale: f64,
    /// Rule applies only to features no normal rule of the style matched.
    #[cfg_attr(feature = "serde", serde(rename = "else"))]
    pub else_filter: bool,
    /// Rule applies in addition to whatever else matched.
    #[cfg_attr(feature = "serde", serde(rename = "also"))]
    pub also_filter: bool,
    /// Symbolizers, drawn in order.
    pub symbolizers: Vec<Symbolizer>,
}

impl Default for Rule {
    fn default() -> Self {
        Self {
            name: None,
            filter: None,
            min_scale: 0.0,
            max_scale: f64::INFINITY,
            else_filter: false,
            also_filter: false,
            symbolizers: vec![],
        }
    }
}

impl Rule {
    /// Rule matching every feature at every scale.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Sets the filter.
    pub fn with_filter(mut self, filter: Expression) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Sets the scale range `[min, max)`.
    pub fn with_scale_range(mut self, min: f64, max: f64) -> Self {
        self.min_scale = min;
        self.max_scale = max;
        self
    }

    /// Turns the rule into an else-rule.
    pub fn as_else(mut self) -> Self {
        self.else_filter = true;
        self
    }

    /// Turns the rule into an also-rule.
    pub fn as_also(mut self) -> Self {
        self.also_filter = true;
        self
    }

    /// Adds a symbolizer.
    pub fn with_symbolizer(mut self, symbolizer: impl Into<Symbolizer>) -> Self {
        self.symbolizers.push(symbolizer.into());
        self
    }

    /// Whether the scale denominator is in `[min_scale, max_scale)`.
    pub fn is_active_at(&self, scale_denominator: f64) -> bool {
        scale_denominator >= self.min_scale && scale_denominator < self.max_scale
    }

    /// Whether the filter accepts the feature. `null` filter results don't match.
    pub fn matches(&self, context: &EvalContext) -> bool {
        self.filter
            .as_ref()
            .map_or(true, |filter| filter.evaluate_filter(context))
    }

    fn collect_attributes(&self, out: &mut BTreeSet<String>) {
        if let Some(filter) = &self.filter {
            filter.collect_attributes(out);
        }
        for symbolizer in &self.symbolizers {
            symbolizer.collect_attributes(out);
        }
    }
}
