pub mod reminder_loop;
pub mod sweeper_loop;
pub mod task_runner;
