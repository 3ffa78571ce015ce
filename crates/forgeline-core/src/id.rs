use slotmap::new_key_type;

new_key_type! {
    /// Identifies a resource node in the world.
    pub struct NodeId;

    /// Identifies a production building (miner, smelter, arms factory).
    pub struct BuildingId;

    /// Identifies one conveyor segment.
    pub struct SegmentId;
}
