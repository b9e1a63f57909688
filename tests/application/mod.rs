mod job_queue_test;
mod rate_limiter_test;
