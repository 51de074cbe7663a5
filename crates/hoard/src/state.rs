use hoard_kv::Root;
use serde::{Deserialize, Serialize};

/// The committed pair of roots held in the state cell.
///
/// Both roots change together in one compare-and-swap, so a reader never
/// sees a corpus entry without the index entries written alongside it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct State {
    pub corpus: Root,
    pub index: Root,
}

#[cfg(test)]
mod tests {
    use super::*;
    use hoard_types::ObjectId;

    #[test]
    fn json_round_trip() {
        let state = State {
            corpus: Root::from_id(ObjectId::from_hash([1; 32])),
            index: Root::from_id(ObjectId::from_hash([2; 32])),
        };
        let json = serde_json::to_vec(&state).unwrap();
        assert_eq!(serde_json::from_slice::<State>(&json).unwrap(), state);
    }
}
