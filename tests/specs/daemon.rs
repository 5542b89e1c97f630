mod local_start;
mod remote_dispatch;
mod zombie_reconciliation;
