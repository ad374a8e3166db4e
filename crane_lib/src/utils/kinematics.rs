// Forward kinematics of the crane as a list of rigid steps

use nalgebra::{Matrix4, Vector3, Vector4};
use serde::{Deserialize, Serialize};

use crate::types::{CartesianPosition, Dimensions, JointState, Orientation};

/// Named points along the chain where the running transform is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Segment {
    Base,
    Column,
    UpperArm,
    Wrist,
    Gripper,
    GripperGeometry,
}

impl Segment {
    pub const ALL: [Segment; 6] = [
        Segment::Base,
        Segment::Column,
        Segment::UpperArm,
        Segment::Wrist,
        Segment::Gripper,
        Segment::GripperGeometry,
    ];

    /// Centre of the segment's body, expressed in the segment's own frame.
    ///
    /// Columns grow upward from their frame origin; arm segments extend along +X.
    pub fn geometry_offset(&self, dims: &Dimensions) -> Vector3<f64> {
        match self {
            Segment::Base => Vector3::new(0.0, dims.base.height / 2.0, 0.0),
            Segment::Column => Vector3::new(0.0, dims.column.height / 2.0, 0.0),
            Segment::UpperArm => Vector3::new(dims.upper_arm.width / 2.0, 0.0, 0.0),
            Segment::Wrist => Vector3::new(dims.lower_arm.width / 2.0, 0.0, 0.0),
            Segment::Gripper | Segment::GripperGeometry => {
                Vector3::new(dims.gripper.width / 2.0, 0.0, 0.0)
            }
        }
    }
}

/// One elementary transform of the chain. Angles are stored in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Step {
    Translate(Vector3<f64>),
    RotateX(f64),
    RotateY(f64),
    RotateZ(f64),
    Scale(Vector3<f64>),
    Frame(Segment),
}

impl Step {
    pub fn translate(x: f64, y: f64, z: f64) -> Self {
        Step::Translate(Vector3::new(x, y, z))
    }

    pub fn rotate_x_deg(deg: f64) -> Self {
        Step::RotateX(deg.to_radians())
    }

    pub fn rotate_y_deg(deg: f64) -> Self {
        Step::RotateY(deg.to_radians())
    }

    pub fn rotate_z_deg(deg: f64) -> Self {
        Step::RotateZ(deg.to_radians())
    }

    /// Homogeneous matrix of this step. `Frame` is the identity.
    pub fn matrix(&self) -> Matrix4<f64> {
        match self {
            Step::Translate(v) => Matrix4::new_translation(v),
            Step::RotateX(rad) => Matrix4::from_axis_angle(&Vector3::x_axis(), *rad),
            Step::RotateY(rad) => Matrix4::from_axis_angle(&Vector3::y_axis(), *rad),
            Step::RotateZ(rad) => Matrix4::from_axis_angle(&Vector3::z_axis(), *rad),
            Step::Scale(v) => Matrix4::new_nonuniform_scaling(v),
            Step::Frame(_) => Matrix4::identity(),
        }
    }
}

/// World transforms of every crane segment plus the end-effector position.
///
/// This is everything a renderer needs to place the crane geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainTransforms {
    pub base: Matrix4<f64>,
    pub column: Matrix4<f64>,
    pub upper_arm: Matrix4<f64>,
    pub wrist: Matrix4<f64>,
    pub gripper: Matrix4<f64>,
    pub gripper_geometry: Matrix4<f64>,
    pub end_effector: CartesianPosition,
}

impl ChainTransforms {
    /// Compose `steps` left to right, recording the running transform at each `Frame`.
    /// Segments never framed stay at the identity.
    pub fn from_steps(steps: &[Step]) -> Self {
        let identity = Matrix4::identity();
        let empty = ChainTransforms {
            base: identity,
            column: identity,
            upper_arm: identity,
            wrist: identity,
            gripper: identity,
            gripper_geometry: identity,
            end_effector: CartesianPosition::default(),
        };

        let (_, mut chain) = steps
            .iter()
            .fold((identity, empty), |(current, mut chain), step| match step {
                Step::Frame(segment) => {
                    *chain.frame_mut(*segment) = current;
                    (current, chain)
                }
                other => (current * other.matrix(), chain),
            });

        chain.end_effector = translation_of(&chain.gripper);
        chain
    }

    pub fn frame(&self, segment: Segment) -> &Matrix4<f64> {
        match segment {
            Segment::Base => &self.base,
            Segment::Column => &self.column,
            Segment::UpperArm => &self.upper_arm,
            Segment::Wrist => &self.wrist,
            Segment::Gripper => &self.gripper,
            Segment::GripperGeometry => &self.gripper_geometry,
        }
    }

    fn frame_mut(&mut self, segment: Segment) -> &mut Matrix4<f64> {
        match segment {
            Segment::Base => &mut self.base,
            Segment::Column => &mut self.column,
            Segment::UpperArm => &mut self.upper_arm,
            Segment::Wrist => &mut self.wrist,
            Segment::Gripper => &mut self.gripper,
            Segment::GripperGeometry => &mut self.gripper_geometry,
        }
    }

    /// World position of a segment's body centre.
    pub fn segment_centre(&self, segment: Segment, dims: &Dimensions) -> CartesianPosition {
        let offset = segment.geometry_offset(dims);
        let p = self.frame(segment) * Vector4::new(offset.x, offset.y, offset.z, 1.0);
        CartesianPosition::new(p.x, p.y, p.z)
    }

    pub fn is_finite(&self) -> bool {
        Segment::ALL
            .iter()
            .all(|s| self.frame(*s).iter().all(|v| v.is_finite()))
            && self.end_effector.is_finite()
    }

    /// Element-wise comparison of every frame and the end effector.
    pub fn approx_eq(&self, other: &ChainTransforms, tolerance: f64) -> bool {
        Segment::ALL.iter().all(|s| {
            self.frame(*s)
                .iter()
                .zip(other.frame(*s).iter())
                .all(|(a, b)| (a - b).abs() <= tolerance)
        }) && self.end_effector.distance_to(&other.end_effector) <= tolerance
    }
}

fn translation_of(m: &Matrix4<f64>) -> CartesianPosition {
    CartesianPosition::new(m[(0, 3)], m[(1, 3)], m[(2, 3)])
}

/// Step list of the crane for the given joints and base placement.
///
/// "elbow" rotates the wrist pivot and "wrist" rotates the gripper pivot; the backend
/// uses the same mapping.
pub fn crane_chain(
    joints: &JointState,
    orientation: &Orientation,
    dims: &Dimensions,
) -> Vec<Step> {
    vec![
        Step::translate(orientation.x, orientation.y, orientation.z),
        Step::rotate_z_deg(orientation.rotation_z),
        Step::Frame(Segment::Base),
        Step::translate(0.0, dims.base.height, 0.0),
        Step::rotate_y_deg(joints.swing),
        Step::Frame(Segment::Column),
        Step::translate(0.0, joints.lift, 0.0),
        Step::Frame(Segment::UpperArm),
        Step::translate(dims.upper_arm.width, -dims.upper_spacer.height, 0.0),
        Step::rotate_y_deg(joints.elbow),
        Step::Frame(Segment::Wrist),
        Step::translate(dims.lower_arm.width, -dims.lower_spacer.height, 0.0),
        Step::rotate_y_deg(joints.wrist),
        Step::Frame(Segment::Gripper),
        Step::Scale(Vector3::new(1.0, 1.0, 1.0 + joints.gripper)),
        Step::Frame(Segment::GripperGeometry),
    ]
}

/// Forward kinematics: joints, base placement and structure to segment transforms.
///
/// Out-of-range joints are not rejected here.
pub fn compute_pose(
    joints: &JointState,
    orientation: &Orientation,
    dims: &Dimensions,
) -> ChainTransforms {
    ChainTransforms::from_steps(&crane_chain(joints, orientation, dims))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_position(actual: &CartesianPosition, expected: (f64, f64, f64)) {
        let expected = CartesianPosition::new(expected.0, expected.1, expected.2);
        assert!(
            actual.distance_to(&expected) < 1e-9,
            "expected {:?}, got {:?}",
            expected,
            actual
        );
    }

    #[test]
    fn test_default_pose() {
        let dims = Dimensions::default();
        let pose = compute_pose(&JointState::default(), &Orientation::default(), &dims);

        // 0.4 base + 1.0 lift - 0.5 spacer - 0.15 spacer
        assert_position(&pose.end_effector, (2.0, 0.75, 0.0));
        assert_position(&translation_of(&pose.column), (0.0, 0.4, 0.0));
        assert_position(&translation_of(&pose.upper_arm), (0.0, 1.4, 0.0));
        assert_position(&translation_of(&pose.wrist), (1.0, 0.9, 0.0));
    }

    #[test]
    fn test_swing_rotates_whole_arm() {
        let dims = Dimensions::default();
        let joints = JointState::new(90.0, 1.0, 0.0, 0.0, 0.0);
        let pose = compute_pose(&joints, &Orientation::default(), &dims);
        assert_position(&pose.end_effector, (0.0, 0.75, -2.0));
    }

    #[test]
    fn test_elbow_rotates_at_wrist_pivot() {
        let dims = Dimensions::default();
        let joints = JointState::new(0.0, 1.0, 90.0, 0.0, 0.0);
        let pose = compute_pose(&joints, &Orientation::default(), &dims);

        // The wrist pivot itself does not move
        assert_position(&translation_of(&pose.wrist), (1.0, 0.9, 0.0));
        assert_position(&pose.end_effector, (1.0, 0.75, -1.0));
    }

    #[test]
    fn test_wrist_does_not_move_end_effector() {
        let dims = Dimensions::default();
        let joints = JointState::new(0.0, 1.0, 0.0, 45.0, 0.0);
        let pose = compute_pose(&joints, &Orientation::default(), &dims);
        assert_position(&pose.end_effector, (2.0, 0.75, 0.0));
        assert!((pose.gripper[(0, 0)] - 45f64.to_radians().cos()).abs() < 1e-12);
    }

    #[test]
    fn test_lift_moves_vertically() {
        let dims = Dimensions::default();
        let joints = JointState::new(0.0, 2.0, 0.0, 0.0, 0.0);
        let pose = compute_pose(&joints, &Orientation::default(), &dims);
        assert_position(&pose.end_effector, (2.0, 1.75, 0.0));
    }

    #[test]
    fn test_orientation_places_base() {
        let dims = Dimensions::default();
        let orientation = Orientation::new(1.0, 2.0, 3.0, 90.0);
        let pose = compute_pose(&JointState::default(), &orientation, &dims);

        assert_position(&translation_of(&pose.base), (1.0, 2.0, 3.0));
        assert_position(&pose.end_effector, (0.25, 4.0, 3.0));

        let local = orientation.to_local(&pose.end_effector);
        assert_position(&local, (2.0, 0.75, 0.0));
    }

    #[test]
    fn test_gripper_scale_only_affects_geometry() {
        let dims = Dimensions::default();
        let closed = compute_pose(&JointState::default(), &Orientation::default(), &dims);
        let open = compute_pose(
            &JointState::new(0.0, 1.0, 0.0, 0.0, 1.0),
            &Orientation::default(),
            &dims,
        );

        assert_eq!(closed.gripper, open.gripper);
        assert_eq!(closed.end_effector, open.end_effector);
        assert!((open.gripper_geometry[(2, 2)] - 2.0).abs() < 1e-12);
        assert!((closed.gripper_geometry[(2, 2)] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_in_range_joints_are_finite() {
        let dims = Dimensions::default();
        let orientation = Orientation::new(-3.0, 0.5, 7.0, 135.0);
        for swing in [-180.0, -90.0, 0.0, 45.0, 180.0] {
            for lift in [0.0, 1.0, dims.lift_max()] {
                for angle in [-180.0, -30.0, 0.0, 120.0, 180.0] {
                    for gripper in [0.0, 0.5, 1.0] {
                        let joints = JointState::new(swing, lift, angle, -angle, gripper);
                        let pose = compute_pose(&joints, &orientation, &dims);
                        assert!(pose.is_finite(), "non-finite pose for {:?}", joints);
                    }
                }
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let dims = Dimensions::default();
        let joints = JointState::new(33.3, 1.23, -71.0, 12.5, 0.4);
        let orientation = Orientation::new(0.1, -0.2, 0.3, 17.0);
        let a = compute_pose(&joints, &orientation, &dims);
        let b = compute_pose(&joints, &orientation, &dims);
        assert!(a.approx_eq(&b, 1e-9));
    }

    #[test]
    fn test_segment_centres() {
        let dims = Dimensions::default();
        let pose = compute_pose(&JointState::default(), &Orientation::default(), &dims);
        let column = pose.segment_centre(Segment::Column, &dims);
        assert_position(&column, (0.0, 1.4, 0.0));
        let upper_arm = pose.segment_centre(Segment::UpperArm, &dims);
        assert_position(&upper_arm, (0.5, 1.4, 0.0));
    }

    #[test]
    fn test_rotate_x_step() {
        let chain = ChainTransforms::from_steps(&[
            Step::rotate_x_deg(90.0),
            Step::translate(0.0, 1.0, 0.0),
            Step::Frame(Segment::Gripper),
        ]);
        assert_position(&chain.end_effector, (0.0, 0.0, 1.0));
        assert_eq!(chain.base, Matrix4::identity());
    }
}
