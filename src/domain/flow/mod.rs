//! Flow classification - deciding which conversation mode a request
//! belongs to.

mod classifier;

pub use classifier::{
    Classification, ClassificationError, ClassificationRule, FlowClassifier, FlowRequest,
};
