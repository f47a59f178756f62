mod like_count_reconciliation;

pub use like_count_reconciliation::LikeCountReconciliationJob;
