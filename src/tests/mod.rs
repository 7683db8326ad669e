// Test modules for Campus Chat
// Each module tests the corresponding source module; scenario_tests walks
// through complete conversations end to end.

mod helpers;
