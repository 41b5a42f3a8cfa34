mod alarm_storage_tests;
