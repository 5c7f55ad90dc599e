//! Dense optical flow estimators backed by OpenCV.

use crate::convert::{flow_to_mat, frame_to_mat, mat_to_flow};
use ofbench::prelude::v1::*;
use opencv::core::{Mat, Ptr};
use opencv::optflow;
use opencv::prelude::*;
use opencv::video::{self, DenseOpticalFlow};

/// Any OpenCV `DenseOpticalFlow` implementation.
pub struct CvEstimator {
    name: &'static str,
    flow: Ptr<dyn DenseOpticalFlow>,
}

impl CvEstimator {
    pub fn new(name: &'static str, flow: Ptr<dyn DenseOpticalFlow>) -> Self {
        Self { name, flow }
    }
}

impl FlowEstimator for CvEstimator {
    fn calc(
        &mut self,
        prev: &Frame,
        curr: &Frame,
        guess: Option<&FlowField>,
    ) -> anyhow::Result<FlowField> {
        let i0 = frame_to_mat(prev)?;
        let i1 = frame_to_mat(curr)?;

        // A pre-filled output is taken as the initial estimate.
        let mut flow = match guess {
            Some(guess) => flow_to_mat(guess)?,
            None => Mat::default(),
        };

        self.flow
            .calc(&i0, &i1, &mut flow)
            .map_err(|e| anyhow!("{}: {}", self.name, e))?;

        mat_to_flow(&flow)
    }
}

/// Build the OpenCV estimator for a catalog entry.
pub fn create(desc: &AlgorithmDescriptor) -> anyhow::Result<Box<dyn FlowEstimator>> {
    let flow: Ptr<dyn DenseOpticalFlow> = match desc.name {
        "DIS_Medium" => optflow::create_opt_flow_dis(video::DISOpticalFlow_PRESET_MEDIUM)?,
        "DIS_Fast" => optflow::create_opt_flow_dis(video::DISOpticalFlow_PRESET_FAST)?,
        "DIS_UltraFast" => optflow::create_opt_flow_dis(video::DISOpticalFlow_PRESET_ULTRAFAST)?,
        "Farneback" => optflow::create_opt_flow_farneback()?,
        "DenseRLOF" => optflow::create_opt_flow_dense_rlof()?,
        "DualTVL1" => optflow::create_opt_flow_dual_tvl1()?,
        "PCAFlow" => optflow::create_opt_flow_pca_flow()?,
        "DeepFlow" => optflow::create_opt_flow_deep_flow()?,
        name => return Err(anyhow!("no OpenCV estimator for {}", name)),
    };

    Ok(Box::new(CvEstimator::new(desc.name, flow)))
}
