//! Token usage accounting for a single call

use super::StreamEvent;

/// How a provider's usage reports combine over one stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UsagePolicy {
    /// Each report carries running totals; the latest value wins
    Replace,
    /// Each report carries increments that are summed
    Additive,
}

/// Running `{input_tokens, output_tokens}` totals for one call
///
/// A field that was never reported stays `None` so callers can tell
/// "unknown cost" apart from "zero tokens".
#[derive(Debug, Clone)]
pub struct UsageAccumulator {
    policy: UsagePolicy,
    input_tokens: Option<u64>,
    output_tokens: Option<u64>,
}

impl UsageAccumulator {
    pub fn new(policy: UsagePolicy) -> Self {
        Self {
            policy,
            input_tokens: None,
            output_tokens: None,
        }
    }

    pub fn policy(&self) -> UsagePolicy {
        self.policy
    }

    /// Fold one usage report into the totals
    pub fn apply(&mut self, input_tokens: Option<u64>, output_tokens: Option<u64>) {
        Self::merge(self.policy, &mut self.input_tokens, input_tokens);
        Self::merge(self.policy, &mut self.output_tokens, output_tokens);
    }

    /// Fold a stream event; events other than usage updates are ignored
    pub fn record(&mut self, event: &StreamEvent) {
        if let StreamEvent::UsageUpdate {
            input_tokens,
            output_tokens,
        } = event
        {
            self.apply(*input_tokens, *output_tokens);
        }
    }

    pub fn input_tokens(&self) -> Option<u64> {
        self.input_tokens
    }

    pub fn output_tokens(&self) -> Option<u64> {
        self.output_tokens
    }

    /// Final `(input_tokens, output_tokens)`
    pub fn finalize(self) -> (Option<u64>, Option<u64>) {
        (self.input_tokens, self.output_tokens)
    }

    fn merge(policy: UsagePolicy, total: &mut Option<u64>, reported: Option<u64>) {
        let Some(value) = reported else {
            return;
        };
        *total = Some(match policy {
            UsagePolicy::Replace => value,
            UsagePolicy::Additive => total.unwrap_or(0).saturating_add(value),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_keeps_last_report() {
        let mut usage = UsageAccumulator::new(UsagePolicy::Replace);
        usage.apply(Some(10), Some(1));
        usage.apply(Some(12), Some(7));
        assert_eq!(usage.finalize(), (Some(12), Some(7)));
    }

    #[test]
    fn test_additive_sums_reports() {
        let mut usage = UsageAccumulator::new(UsagePolicy::Additive);
        usage.apply(Some(10), Some(0));
        usage.apply(Some(0), Some(5));
        usage.apply(None, Some(2));
        assert_eq!(usage.finalize(), (Some(10), Some(7)));
    }

    #[test]
    fn test_unreported_fields_stay_unknown() {
        let usage = UsageAccumulator::new(UsagePolicy::Additive);
        assert_eq!(usage.finalize(), (None, None));

        let mut usage = UsageAccumulator::new(UsagePolicy::Replace);
        usage.apply(Some(3), None);
        assert_eq!(usage.finalize(), (Some(3), None));
    }

    #[test]
    fn test_record_ignores_deltas() {
        let mut usage = UsageAccumulator::new(UsagePolicy::Replace);
        usage.record(&StreamEvent::delta("hi"));
        usage.record(&StreamEvent::usage(Some(4), Some(2)));
        usage.record(&StreamEvent::Done);
        assert_eq!(usage.input_tokens(), Some(4));
        assert_eq!(usage.output_tokens(), Some(2));
    }
}
