//! Declarative rig-naming data used by the retargeter.
//!
//! New rig conventions are data, not code: the vendor bone prefix, the
//! canonical humanoid-bone table, and the leaf-bone synonym tables all live
//! here so another convention can be supported by extending the tables.

use hashbrown::HashMap;

/// Prefix Mixamo-authored rigs put on every bone name.
pub const VENDOR_BONE_PREFIX: &str = "mixamorig:";

/// Rig bone name (vendor prefix already stripped) -> canonical humanoid bone
/// name, VRM-style.
pub const CANONICAL_HUMANOID_NAMES: &[(&str, &str)] = &[
    ("Hips", "hips"),
    ("Spine", "spine"),
    ("Spine1", "chest"),
    ("Spine2", "upperChest"),
    ("Neck", "neck"),
    ("Head", "head"),
    ("Jaw", "jaw"),
    ("LeftEye", "leftEye"),
    ("RightEye", "rightEye"),
    ("LeftShoulder", "leftShoulder"),
    ("LeftArm", "leftUpperArm"),
    ("LeftForeArm", "leftLowerArm"),
    ("LeftHand", "leftHand"),
    ("RightShoulder", "rightShoulder"),
    ("RightArm", "rightUpperArm"),
    ("RightForeArm", "rightLowerArm"),
    ("RightHand", "rightHand"),
    ("LeftUpLeg", "leftUpperLeg"),
    ("LeftLeg", "leftLowerLeg"),
    ("LeftFoot", "leftFoot"),
    ("LeftToeBase", "leftToes"),
    ("RightUpLeg", "rightUpperLeg"),
    ("RightLeg", "rightLowerLeg"),
    ("RightFoot", "rightFoot"),
    ("RightToeBase", "rightToes"),
    ("LeftHandThumb1", "leftThumbProximal"),
    ("LeftHandThumb2", "leftThumbIntermediate"),
    ("LeftHandThumb3", "leftThumbDistal"),
    ("LeftHandIndex1", "leftIndexProximal"),
    ("LeftHandIndex2", "leftIndexIntermediate"),
    ("LeftHandIndex3", "leftIndexDistal"),
    ("LeftHandMiddle1", "leftMiddleProximal"),
    ("LeftHandMiddle2", "leftMiddleIntermediate"),
    ("LeftHandMiddle3", "leftMiddleDistal"),
    ("LeftHandRing1", "leftRingProximal"),
    ("LeftHandRing2", "leftRingIntermediate"),
    ("LeftHandRing3", "leftRingDistal"),
    ("LeftHandPinky1", "leftLittleProximal"),
    ("LeftHandPinky2", "leftLittleIntermediate"),
    ("LeftHandPinky3", "leftLittleDistal"),
    ("RightHandThumb1", "rightThumbProximal"),
    ("RightHandThumb2", "rightThumbIntermediate"),
    ("RightHandThumb3", "rightThumbDistal"),
    ("RightHandIndex1", "rightIndexProximal"),
    ("RightHandIndex2", "rightIndexIntermediate"),
    ("RightHandIndex3", "rightIndexDistal"),
    ("RightHandMiddle1", "rightMiddleProximal"),
    ("RightHandMiddle2", "rightMiddleIntermediate"),
    ("RightHandMiddle3", "rightMiddleDistal"),
    ("RightHandRing1", "rightRingProximal"),
    ("RightHandRing2", "rightRingIntermediate"),
    ("RightHandRing3", "rightRingDistal"),
    ("RightHandPinky1", "rightLittleProximal"),
    ("RightHandPinky2", "rightLittleIntermediate"),
    ("RightHandPinky3", "rightLittleDistal"),
];

/// Canonical humanoid bone name for a rig bone, if the bone is a known
/// humanoid bone under the supported conventions.
pub fn canonical_humanoid_name(bone_name: &str) -> Option<&'static str> {
    let stripped = bone_name
        .strip_prefix(VENDOR_BONE_PREFIX)
        .unwrap_or(bone_name);
    CANONICAL_HUMANOID_NAMES
        .iter()
        .find(|(rig, _)| *rig == stripped)
        .map(|(_, canonical)| *canonical)
}

/// Cross-convention synonyms for terminal joints. These leaf bones sit
/// outside the humanoid set, so they can only be matched by name.
pub const TERMINAL_BONE_SYNONYMS: &[(&str, &str)] = &[
    ("LeftToeBase_End", "LeftToe_End"),
    ("RightToeBase_End", "RightToe_End"),
    ("HeadTop_End", "Head_End"),
    ("LeftHandThumb4", "LeftThumbTip"),
    ("LeftHandIndex4", "LeftIndexTip"),
    ("LeftHandMiddle4", "LeftMiddleTip"),
    ("LeftHandRing4", "LeftRingTip"),
    ("LeftHandPinky4", "LeftLittleTip"),
    ("RightHandThumb4", "RightThumbTip"),
    ("RightHandIndex4", "RightIndexTip"),
    ("RightHandMiddle4", "RightMiddleTip"),
    ("RightHandRing4", "RightRingTip"),
    ("RightHandPinky4", "RightLittleTip"),
];

const FINGERS: [&str; 5] = ["Thumb", "Index", "Middle", "Ring", "Pinky"];

/// Mirrored left/right finger-segment pairs under the vendor prefix:
/// "mixamorig:LeftHandThumb1" <-> "Thumb1_L" and so on for every finger and
/// segment on both sides.
pub fn finger_segment_synonyms() -> Vec<(String, String)> {
    let mut pairs = Vec::new();
    for (side, suffix) in [("Left", "_L"), ("Right", "_R")] {
        for finger in FINGERS {
            for segment in 1..=4 {
                pairs.push((
                    format!("{VENDOR_BONE_PREFIX}{side}Hand{finger}{segment}"),
                    format!("{finger}{segment}{suffix}"),
                ));
            }
        }
    }
    pairs
}

/// Bidirectional synonym lookup combining the static terminal-joint table and
/// the generated finger-segment pairs.
pub fn synonym_map() -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();
    let mut add = |a: &str, b: &str| {
        map.entry(a.to_string()).or_default().push(b.to_string());
        map.entry(b.to_string()).or_default().push(a.to_string());
    };
    for &(a, b) in TERMINAL_BONE_SYNONYMS {
        add(a, b);
    }
    for (a, b) in finger_segment_synonyms() {
        add(&a, &b);
    }
    map
}
