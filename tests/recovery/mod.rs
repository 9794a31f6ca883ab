mod partial_commit_case1;
mod restart_case1;
