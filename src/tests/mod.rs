mod test_descriptors;
mod test_pose_properties;
