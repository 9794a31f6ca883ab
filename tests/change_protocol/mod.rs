mod commit_case1;
mod composite_case1;
mod rejection_case1;
