//! # Dense optical flow estimator

use crate::prelude::v1::*;

/// Generic dense optical flow estimator.
///
/// Implementations wrap a concrete algorithm of the vision backend. Any fault coming from the
/// backend must be turned into an `Err`, the runner never expects a panic to cross this boundary.
pub trait FlowEstimator {
    /// Estimate the flow between two consecutive frames.
    ///
    /// The returned field must have the same dimensions as the input frames.
    ///
    /// # Arguments
    ///
    /// * `prev` - previous frame.
    /// * `curr` - current frame.
    /// * `guess` - optional initial approximation of the resulting flow.
    fn calc(
        &mut self,
        prev: &Frame,
        curr: &Frame,
        guess: Option<&FlowField>,
    ) -> anyhow::Result<FlowField>;
}

impl<T: FlowEstimator + ?Sized> FlowEstimator for Box<T> {
    fn calc(
        &mut self,
        prev: &Frame,
        curr: &Frame,
        guess: Option<&FlowField>,
    ) -> anyhow::Result<FlowField> {
        (**self).calc(prev, curr, guess)
    }
}

/// Invoke an estimator and check its output.
///
/// Results of the wrong size, or holding NaN or infinite displacements, are reported as an
/// estimation failure, same as a backend error.
pub fn estimate(
    estimator: &mut dyn FlowEstimator,
    prev: &Frame,
    curr: &Frame,
    guess: Option<&FlowField>,
) -> Result<FlowField> {
    let flow = estimator
        .calc(prev, curr, guess)
        .map_err(Error::Estimation)?;

    if flow.dim() != curr.dim() {
        return Err(Error::Estimation(anyhow!(
            "estimator returned {:?} field for {:?} frame",
            flow.dim(),
            curr.dim()
        )));
    }

    if !flow.is_finite() {
        return Err(Error::Estimation(anyhow!("estimator returned non-finite flow")));
    }

    Ok(flow)
}
