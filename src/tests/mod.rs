mod api_tests;
mod eligibility_tests;
mod planner_tests;
mod support;
