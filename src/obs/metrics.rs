// self
use crate::obs::{FlowKind, FlowOutcome};

/// Increments `authed_client_flow_total{flow, outcome}` on the global recorder.
///
/// Compiles to nothing unless the `metrics` feature is enabled.
pub fn record_flow_outcome(kind: FlowKind, outcome: FlowOutcome) {
	#[cfg(feature = "metrics")]
	{
		::metrics::counter!(
			"authed_client_flow_total",
			"flow" => kind.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}

	#[cfg(not(feature = "metrics"))]
	{
		let _ = (kind, outcome);
	}
}
